// ── Cable reconciliation ──
//
// Ensures exactly one cable joins two port terminations. A cable's identity
// is the unordered pair of its ends, so declaring a link from either device
// (or from both) converges to the same single object.

use std::collections::HashSet;
use std::fmt;

use nbsync_api::{Endpoint, Object, id_of, object_id};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::apply::Applier;
use crate::color::Color;
use crate::error::CoreError;
use crate::model::LinkIntent;

const CONNECTED: &str = "connected";
const DEFAULT_LENGTH_UNIT: &str = "m";

// ── Terminations ─────────────────────────────────────────────────────

/// Port object types a cable can terminate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationKind {
    Interface,
    FrontPort,
    RearPort,
}

impl TerminationKind {
    /// Content type used in cable terminations, e.g. `dcim.frontport`.
    pub fn object_type(self) -> &'static str {
        match self {
            Self::Interface => "dcim.interface",
            Self::FrontPort => "dcim.frontport",
            Self::RearPort => "dcim.rearport",
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            Self::Interface => Endpoint::Interfaces,
            Self::FrontPort => Endpoint::FrontPorts,
            Self::RearPort => Endpoint::RearPorts,
        }
    }
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_type())
    }
}

/// One resolved end of a cable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CableEndpoint {
    pub device: String,
    pub port: String,
    pub kind: TerminationKind,
    pub id: u64,
}

impl CableEndpoint {
    pub fn new(device: &str, port: &str, kind: TerminationKind, id: u64) -> Self {
        Self {
            device: device.to_owned(),
            port: port.to_owned(),
            kind,
            id,
        }
    }

    fn key(&self) -> String {
        format!("{}:{}:{}", self.kind.object_type(), self.device, self.id)
    }

    fn termination(&self) -> Value {
        json!([{ "object_type": self.kind.object_type(), "object_id": self.id }])
    }
}

impl fmt::Display for CableEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.device, self.port)
    }
}

/// Order-independent identity of a link: `pair_id(a, b) == pair_id(b, a)`.
pub fn pair_id(a: &CableEndpoint, b: &CableEndpoint) -> String {
    let (x, y) = (a.key(), b.key());
    if x <= y {
        format!("{x} <-> {y}")
    } else {
        format!("{y} <-> {x}")
    }
}

// ── Desired attributes ───────────────────────────────────────────────

/// Cable attributes derived from a [`LinkIntent`].
#[derive(Debug, Clone, PartialEq)]
pub struct CableAttributes {
    pub cable_type: String,
    pub color: Option<Color>,
    pub length: Option<f64>,
    pub length_unit: Option<String>,
}

impl CableAttributes {
    /// An unparseable color is warned about and left unmanaged.
    pub fn from_intent(link: &LinkIntent) -> Self {
        let color = link.color.as_deref().and_then(|raw| match raw.parse::<Color>() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(peer = %link.peer_device, port = %link.peer_port, error = %e, "ignoring cable color");
                None
            }
        });
        let length_unit = link.length.map(|_| {
            link.length_unit
                .clone()
                .unwrap_or_else(|| DEFAULT_LENGTH_UNIT.into())
        });
        Self {
            cable_type: link.cable_type.clone(),
            color,
            length: link.length,
            length_unit,
        }
    }

    /// Fields of an existing cable that differ from these attributes.
    pub fn changes(&self, cable: &Object) -> Object {
        let mut changes = Object::new();

        if choice(cable.get("type")) != Some(self.cable_type.as_str()) {
            changes.insert("type".into(), self.cable_type.clone().into());
        }
        if let Some(color) = &self.color {
            let current = cable.get("color").and_then(Value::as_str).unwrap_or_default();
            if !current.eq_ignore_ascii_case(color.as_hex()) {
                changes.insert("color".into(), color.as_hex().into());
            }
        }
        if let Some(length) = self.length {
            let current = cable.get("length").and_then(number);
            if current.is_none_or(|c| (c - length).abs() > 1e-9) {
                changes.insert("length".into(), length.into());
            }
        }
        if let Some(unit) = &self.length_unit {
            if choice(cable.get("length_unit")) != Some(unit.as_str()) {
                changes.insert("length_unit".into(), unit.clone().into());
            }
        }
        changes
    }

    fn payload(&self, a: &CableEndpoint, b: &CableEndpoint) -> Object {
        let mut payload = Object::new();
        payload.insert("a_terminations".into(), a.termination());
        payload.insert("b_terminations".into(), b.termination());
        payload.insert("status".into(), CONNECTED.into());
        payload.insert("type".into(), self.cable_type.clone().into());
        if let Some(color) = &self.color {
            payload.insert("color".into(), color.as_hex().into());
        }
        if let Some(length) = self.length {
            payload.insert("length".into(), length.into());
        }
        if let Some(unit) = &self.length_unit {
            payload.insert("length_unit".into(), unit.clone().into());
        }
        payload
    }
}

/// Plain string or `{ "value": ... }` choice field.
fn choice(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("value").and_then(Value::as_str),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ── Termination matching ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Side {
    A,
    B,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

/// Whether `side` of `cable` terminates on `end`, in either the flat
/// `termination_x_*` form or the `x_terminations` array form.
fn side_matches(cable: &Object, side: Side, end: &CableEndpoint) -> bool {
    let p = side.prefix();
    let flat_type = cable
        .get(&format!("termination_{p}_type"))
        .and_then(Value::as_str);
    let flat_id = cable.get(&format!("termination_{p}_id")).and_then(id_of);
    if flat_type == Some(end.kind.object_type()) && flat_id == Some(end.id) {
        return true;
    }

    cable
        .get(&format!("{p}_terminations"))
        .and_then(Value::as_array)
        .is_some_and(|terms| terms.iter().any(|t| term_matches(t, end)))
}

fn term_matches(term: &Value, end: &CableEndpoint) -> bool {
    let id = term
        .get("object_id")
        .and_then(id_of)
        .or_else(|| term.get("object").and_then(id_of));
    let kind_ok = term
        .get("object_type")
        .and_then(Value::as_str)
        .is_none_or(|t| t == end.kind.object_type());
    id == Some(end.id) && kind_ok
}

/// Whether either side of `cable` terminates on `end`.
pub fn cable_connects_to(cable: &Object, end: &CableEndpoint) -> bool {
    side_matches(cable, Side::A, end) || side_matches(cable, Side::B, end)
}

// ── Reconciler ───────────────────────────────────────────────────────

/// What [`CableReconciler::reconcile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CableOutcome {
    /// The pair was already handled earlier in this run.
    AlreadyProcessed,
    Unchanged,
    Updated,
    Created,
    /// A port already held the correct cable, found via the port itself.
    AlreadyConnected,
}

enum PortState {
    Free,
    ConnectedToPeer(Object),
    ClearedStray,
}

/// Run-scoped cable reconciler. Remembers every pair it has handled.
pub struct CableReconciler<'a> {
    applier: &'a Applier,
    processed: HashSet<String>,
}

impl<'a> CableReconciler<'a> {
    pub fn new(applier: &'a Applier) -> Self {
        Self {
            applier,
            processed: HashSet::new(),
        }
    }

    /// Number of distinct pairs handled so far.
    pub fn processed(&self) -> usize {
        self.processed.len()
    }

    /// Converge the link between `a` and `b` to `link`.
    pub async fn reconcile(
        &mut self,
        a: &CableEndpoint,
        b: &CableEndpoint,
        link: &LinkIntent,
    ) -> Result<CableOutcome, CoreError> {
        for end in [a, b] {
            if end.id == 0 {
                return Err(CoreError::InvalidEndpoint {
                    reason: format!("{end} ({}) has no id", end.kind),
                });
            }
        }
        if a.kind == b.kind && a.id == b.id {
            return Err(CoreError::InvalidEndpoint {
                reason: format!("{a} cannot be cabled to itself"),
            });
        }

        let pair = pair_id(a, b);
        if !self.processed.insert(pair.clone()) {
            debug!(%pair, "cable already processed");
            return Ok(CableOutcome::AlreadyProcessed);
        }

        let attrs = CableAttributes::from_intent(link);
        debug!(%pair, a = %a, b = %b, "reconciling cable");

        if let Some(existing) = self.find_existing(a, b).await? {
            return self.converge(&existing, &attrs, &pair).await;
        }

        for (port, peer) in [(a, b), (b, a)] {
            match self.check_port(port, peer).await? {
                PortState::Free | PortState::ClearedStray => {}
                PortState::ConnectedToPeer(cable) => {
                    return match self.converge(&cable, &attrs, &pair).await? {
                        CableOutcome::Unchanged => Ok(CableOutcome::AlreadyConnected),
                        other => Ok(other),
                    };
                }
            }
        }

        info!(%pair, a = %a, b = %b, cable_type = %attrs.cable_type, "creating cable");
        self.applier
            .create(Endpoint::Cables, attrs.payload(a, b))
            .await?;
        Ok(CableOutcome::Created)
    }

    /// Search both side assignments for a cable joining `a` and `b`.
    async fn find_existing(
        &self,
        a: &CableEndpoint,
        b: &CableEndpoint,
    ) -> Result<Option<Object>, CoreError> {
        for (first, second) in [(a, b), (b, a)] {
            let query = nbsync_api::Query::new()
                .eq("termination_a_type", first.kind.object_type())
                .eq("termination_a_id", first.id);
            let cables = self
                .applier
                .client()
                .list(Endpoint::Cables, &query)
                .await
                .map_err(CoreError::remote(Endpoint::Cables, &query))?;
            if let Some(cable) = cables
                .into_iter()
                .find(|c| side_matches(c, Side::B, second))
            {
                debug!(id = ?object_id(&cable), "found existing cable");
                return Ok(Some(cable));
            }
        }
        Ok(None)
    }

    /// Inspect the live port: free, already cabled to `peer`, or holding a
    /// stray cable that gets deleted so the desired one can be created.
    async fn check_port(
        &self,
        port: &CableEndpoint,
        peer: &CableEndpoint,
    ) -> Result<PortState, CoreError> {
        let client = self.applier.client();
        let endpoint = port.kind.endpoint();
        let Some(live) = client
            .get(endpoint, port.id)
            .await
            .map_err(CoreError::remote(endpoint, format!("id={}", port.id)))?
        else {
            debug!(port = %port, "port not found, treating as free");
            return Ok(PortState::Free);
        };

        let Some(cable_id) = live.get("cable").and_then(id_of) else {
            return Ok(PortState::Free);
        };

        let Some(cable) = client
            .get(Endpoint::Cables, cable_id)
            .await
            .map_err(CoreError::remote(Endpoint::Cables, format!("id={cable_id}")))?
        else {
            debug!(port = %port, cable_id, "referenced cable vanished");
            return Ok(PortState::Free);
        };

        if cable_connects_to(&cable, peer) {
            debug!(port = %port, cable_id, "port already cabled to peer");
            return Ok(PortState::ConnectedToPeer(cable));
        }

        // A port holds at most one cable; wrong wiring is removed regardless of ownership.
        warn!(
            port = %port,
            expected_peer = %peer,
            cable_id,
            "port holds a cable to a different peer, deleting it"
        );
        self.applier.delete(Endpoint::Cables, cable_id).await?;
        Ok(PortState::ClearedStray)
    }

    async fn converge(
        &self,
        cable: &Object,
        attrs: &CableAttributes,
        pair: &str,
    ) -> Result<CableOutcome, CoreError> {
        let Some(id) = object_id(cable) else {
            return Err(CoreError::InvalidEndpoint {
                reason: format!("cable for {pair} has no id"),
            });
        };
        let changes = attrs.changes(cable);
        if changes.is_empty() {
            debug!(pair, id, "cable unchanged");
            return Ok(CableOutcome::Unchanged);
        }
        for (field, after) in &changes {
            let before = cable.get(field).unwrap_or(&Value::Null);
            info!(pair, id, field = %field, %before, %after, "cable attribute changed");
        }
        self.applier.update(Endpoint::Cables, id, &changes).await?;
        Ok(CableOutcome::Updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    fn end(device: &str, kind: TerminationKind, id: u64) -> CableEndpoint {
        CableEndpoint::new(device, "p", kind, id)
    }

    fn link() -> LinkIntent {
        LinkIntent {
            peer_device: "sw01".into(),
            peer_port: "1".into(),
            cable_type: "cat6a".into(),
            color: Some("blue".into()),
            length: Some(2.0),
            length_unit: None,
        }
    }

    #[test]
    fn pair_id_is_order_independent() {
        let a = end("srv01", TerminationKind::Interface, 10);
        let b = end("pp01", TerminationKind::FrontPort, 3);
        assert_eq!(pair_id(&a, &b), pair_id(&b, &a));
        assert_eq!(
            pair_id(&a, &b),
            "dcim.frontport:pp01:3 <-> dcim.interface:srv01:10"
        );
    }

    #[test]
    fn pair_id_distinguishes_kinds() {
        let a = end("x", TerminationKind::RearPort, 1);
        let b = end("y", TerminationKind::RearPort, 1);
        let c = end("y", TerminationKind::FrontPort, 1);
        assert_ne!(pair_id(&a, &b), pair_id(&a, &c));
    }

    #[test]
    fn side_matching_accepts_both_shapes() {
        let b = end("sw01", TerminationKind::Interface, 42);
        let flat = obj(json!({"termination_b_type": "dcim.interface", "termination_b_id": 42}));
        let array = obj(json!({
            "b_terminations": [{"object_type": "dcim.interface", "object_id": 42}]
        }));
        let wrong_kind = obj(json!({
            "b_terminations": [{"object_type": "dcim.frontport", "object_id": 42}]
        }));
        assert!(side_matches(&flat, Side::B, &b));
        assert!(side_matches(&array, Side::B, &b));
        assert!(!side_matches(&wrong_kind, Side::B, &b));
        assert!(!side_matches(&array, Side::A, &b));
    }

    #[test]
    fn connects_to_checks_both_sides() {
        let cable = obj(json!({
            "a_terminations": [{"object_type": "dcim.interface", "object_id": 5}],
            "b_terminations": [{"object_type": "dcim.frontport", "object_id": 9}],
        }));
        assert!(cable_connects_to(&cable, &end("x", TerminationKind::Interface, 5)));
        assert!(cable_connects_to(&cable, &end("y", TerminationKind::FrontPort, 9)));
        assert!(!cable_connects_to(&cable, &end("z", TerminationKind::Interface, 9)));
    }

    #[test]
    fn spec_defaults_length_unit_only_with_length() {
        let attrs = CableAttributes::from_intent(&link());
        assert_eq!(attrs.length_unit.as_deref(), Some("m"));
        assert_eq!(attrs.color.as_ref().map(Color::as_hex), Some("0000ff"));

        let mut bare = link();
        bare.length = None;
        bare.length_unit = Some("cm".into());
        assert_eq!(CableAttributes::from_intent(&bare).length_unit, None);
    }

    #[test]
    fn invalid_color_is_left_unmanaged() {
        let mut l = link();
        l.color = Some("#12345".into());
        let attrs = CableAttributes::from_intent(&l);
        assert_eq!(attrs.color, None);
        let cable = obj(json!({"type": "cat6a", "color": "ff0000", "length": 2, "length_unit": {"value": "m"}}));
        assert!(attrs.changes(&cable).is_empty());
    }

    #[test]
    fn matching_cable_has_no_changes() {
        let attrs = CableAttributes::from_intent(&link());
        let cable = obj(json!({
            "type": "cat6a",
            "color": "0000FF",
            "length": 2.0,
            "length_unit": {"value": "m", "label": "Meters"},
        }));
        assert!(attrs.changes(&cable).is_empty());
    }

    #[test]
    fn changed_attributes_are_reported() {
        let attrs = CableAttributes::from_intent(&link());
        let cable = obj(json!({"type": "cat5e", "color": "0000ff", "length": null}));
        assert_eq!(
            attrs.changes(&cable),
            obj(json!({"type": "cat6a", "length": 2.0, "length_unit": "m"}))
        );
    }
}

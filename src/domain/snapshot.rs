//! In-memory model of a domain config checkout.

use crate::error::{OpsError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Type discriminator of a domain object.
///
/// Tags the repository may add later land in `Unknown` and are still handled
/// like any other object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Category,
    Currency,
    BusinessSchedule,
    Calendar,
    PaymentMethod,
    PayoutMethod,
    Bank,
    ContractTemplate,
    TermSetHierarchy,
    PaymentInstitution,
    Provider,
    Terminal,
    Inspector,
    SystemAccountSet,
    ExternalAccountSet,
    Proxy,
    Globals,
    CashRegisterProvider,
    RoutingRules,
    BankCardCategory,
    Criterion,
    DocumentType,
    PaymentService,
    PaymentSystem,
    Country,
    TradeBloc,
    IdentityProvider,
    LimitConfig,
    Unknown(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Category => "category",
            ObjectKind::Currency => "currency",
            ObjectKind::BusinessSchedule => "business_schedule",
            ObjectKind::Calendar => "calendar",
            ObjectKind::PaymentMethod => "payment_method",
            ObjectKind::PayoutMethod => "payout_method",
            ObjectKind::Bank => "bank",
            ObjectKind::ContractTemplate => "contract_template",
            ObjectKind::TermSetHierarchy => "term_set_hierarchy",
            ObjectKind::PaymentInstitution => "payment_institution",
            ObjectKind::Provider => "provider",
            ObjectKind::Terminal => "terminal",
            ObjectKind::Inspector => "inspector",
            ObjectKind::SystemAccountSet => "system_account_set",
            ObjectKind::ExternalAccountSet => "external_account_set",
            ObjectKind::Proxy => "proxy",
            ObjectKind::Globals => "globals",
            ObjectKind::CashRegisterProvider => "cash_register_provider",
            ObjectKind::RoutingRules => "routing_rules",
            ObjectKind::BankCardCategory => "bank_card_category",
            ObjectKind::Criterion => "criterion",
            ObjectKind::DocumentType => "document_type",
            ObjectKind::PaymentService => "payment_service",
            ObjectKind::PaymentSystem => "payment_system",
            ObjectKind::Country => "country",
            ObjectKind::TradeBloc => "trade_bloc",
            ObjectKind::IdentityProvider => "identity_provider",
            ObjectKind::LimitConfig => "limit_config",
            ObjectKind::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for ObjectKind {
    fn from(tag: &str) -> Self {
        match tag {
            "category" => ObjectKind::Category,
            "currency" => ObjectKind::Currency,
            "business_schedule" => ObjectKind::BusinessSchedule,
            "calendar" => ObjectKind::Calendar,
            "payment_method" => ObjectKind::PaymentMethod,
            "payout_method" => ObjectKind::PayoutMethod,
            "bank" => ObjectKind::Bank,
            "contract_template" => ObjectKind::ContractTemplate,
            "term_set_hierarchy" => ObjectKind::TermSetHierarchy,
            "payment_institution" => ObjectKind::PaymentInstitution,
            "provider" => ObjectKind::Provider,
            "terminal" => ObjectKind::Terminal,
            "inspector" => ObjectKind::Inspector,
            "system_account_set" => ObjectKind::SystemAccountSet,
            "external_account_set" => ObjectKind::ExternalAccountSet,
            "proxy" => ObjectKind::Proxy,
            "globals" => ObjectKind::Globals,
            "cash_register_provider" => ObjectKind::CashRegisterProvider,
            "routing_rules" => ObjectKind::RoutingRules,
            "bank_card_category" => ObjectKind::BankCardCategory,
            "criterion" => ObjectKind::Criterion,
            "document_type" => ObjectKind::DocumentType,
            "payment_service" => ObjectKind::PaymentService,
            "payment_system" => ObjectKind::PaymentSystem,
            "country" => ObjectKind::Country,
            "trade_bloc" => ObjectKind::TradeBloc,
            "identity_provider" => ObjectKind::IdentityProvider,
            "limit_config" => ObjectKind::LimitConfig,
            other => ObjectKind::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object of the snapshot: a single-tag union value plus its reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainObject {
    pub kind: ObjectKind,
    /// The object's reference as stored, e.g. `{"id": 1}`.
    pub reference: Value,
    /// Payload under the tag (`ref` and `data`).
    pub payload: Value,
}

impl DomainObject {
    /// The tagged value `{tag: payload}` exactly as the repository expects it back.
    pub fn to_value(&self) -> Value {
        let mut tagged = Map::new();
        tagged.insert(self.kind.as_str().to_string(), self.payload.clone());
        Value::Object(tagged)
    }

    fn from_entry(index: usize, entry: RawEntry) -> Result<Self> {
        let mut fields = entry.value.into_iter();
        let (tag, payload) = match (fields.next(), fields.next()) {
            (Some(field), None) => field,
            _ => {
                return Err(OpsError::MalformedSnapshot(format!(
                    "object #{index} must carry exactly one tag"
                )));
            }
        };

        let reference = payload
            .get("ref")
            .cloned()
            .or_else(|| entry.key.as_ref().and_then(|key| key.get(&tag)).cloned())
            .ok_or_else(|| {
                OpsError::MalformedSnapshot(format!("object #{index} ({tag}) has no ref"))
            })?;

        Ok(Self {
            kind: ObjectKind::from(tag.as_str()),
            reference,
            payload,
        })
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    version: u64,
    domain: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    key: Option<Value>,
    value: Map<String, Value>,
}

/// A versioned collection of domain objects, in the order the repository returned them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub version: u64,
    pub objects: Vec<DomainObject>,
}

impl Snapshot {
    /// Parses a `Checkout` reply.
    pub fn parse(raw: &str) -> Result<Self> {
        let snapshot: RawSnapshot =
            serde_json::from_str(raw).map_err(|e| OpsError::MalformedSnapshot(e.to_string()))?;

        let objects = snapshot
            .domain
            .into_iter()
            .enumerate()
            .map(|(index, entry)| DomainObject::from_entry(index, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: snapshot.version,
            objects,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn find_object(&self, kind: &ObjectKind, reference: &Value) -> Option<&DomainObject> {
        self.objects
            .iter()
            .find(|obj| &obj.kind == kind && &obj.reference == reference)
    }

    pub fn refs_of(&self, kind: &ObjectKind) -> Vec<&Value> {
        self.objects
            .iter()
            .filter(|obj| &obj.kind == kind)
            .map(|obj| &obj.reference)
            .collect()
    }
}

/// Collects the ids referenced by a selector, descending into nested decisions.
///
/// Ids are returned once each, in first-seen order.
pub fn selector_values(selector: &Value) -> Vec<Value> {
    let mut acc = Vec::new();
    collect_selector_values(selector, &mut acc);
    acc
}

fn collect_selector_values(selector: &Value, acc: &mut Vec<Value>) {
    if let Some(values) = selector.get("value").and_then(Value::as_array) {
        for id in values.iter().filter_map(|v| v.get("id")) {
            if !acc.contains(id) {
                acc.push(id.clone());
            }
        }
    }

    if let Some(decisions) = selector.get("decisions").and_then(Value::as_array) {
        for then in decisions.iter().filter_map(|d| d.get("then_")) {
            collect_selector_values(then, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checkout_reply() -> String {
        json!({
            "version": 42,
            "domain": [
                {
                    "key": {"category": {"id": 1}},
                    "value": {"category": {"ref": {"id": 1}, "data": {"name": "test"}}}
                },
                {
                    "key": {"currency": {"symbolic_code": "RUB"}},
                    "value": {"currency": {"ref": {"symbolic_code": "RUB"}, "data": {"numeric_code": 643}}}
                },
                {
                    "key": {"category": {"id": 2}},
                    "value": {"category": {"ref": {"id": 2}, "data": {"name": "other"}}}
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_parse_keeps_repository_order() {
        let snapshot = Snapshot::parse(&checkout_reply()).unwrap();
        assert_eq!(snapshot.version, 42);
        assert_eq!(snapshot.len(), 3);
        let kinds: Vec<_> = snapshot.objects.iter().map(|o| o.kind.as_str()).collect();
        assert_eq!(kinds, vec!["category", "currency", "category"]);
        assert_eq!(snapshot.objects[2].reference, json!({"id": 2}));
    }

    #[test]
    fn test_parse_empty_domain() {
        let snapshot = Snapshot::parse(r#"{"version": 0, "domain": []}"#).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.version, 0);
    }

    #[test]
    fn test_parse_missing_fields_is_malformed() {
        assert!(matches!(
            Snapshot::parse(r#"{"domain": []}"#),
            Err(OpsError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::parse(r#"{"version": 3}"#),
            Err(OpsError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::parse("not json"),
            Err(OpsError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_parse_rejects_multi_tag_object() {
        let raw = json!({
            "version": 1,
            "domain": [{"value": {"category": {"ref": {"id": 1}}, "bank": {"ref": {"id": 1}}}}]
        });
        assert!(matches!(
            Snapshot::parse(&raw.to_string()),
            Err(OpsError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_ref_falls_back_to_key() {
        let raw = json!({
            "version": 1,
            "domain": [{"key": {"globals": {}}, "value": {"globals": {"data": {}}}}]
        });
        let snapshot = Snapshot::parse(&raw.to_string()).unwrap();
        assert_eq!(snapshot.objects[0].kind, ObjectKind::Globals);
        assert_eq!(snapshot.objects[0].reference, json!({}));
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let raw = json!({
            "version": 1,
            "domain": [{"value": {"shiny_new_thing": {"ref": {"id": 9}, "data": {}}}}]
        });
        let snapshot = Snapshot::parse(&raw.to_string()).unwrap();
        let obj = &snapshot.objects[0];
        assert_eq!(obj.kind, ObjectKind::Unknown("shiny_new_thing".to_string()));
        assert_eq!(
            obj.to_value(),
            json!({"shiny_new_thing": {"ref": {"id": 9}, "data": {}}})
        );
    }

    #[test]
    fn test_to_value_round_trips_tagged_payload() {
        let snapshot = Snapshot::parse(&checkout_reply()).unwrap();
        assert_eq!(
            snapshot.objects[1].to_value(),
            json!({"currency": {"ref": {"symbolic_code": "RUB"}, "data": {"numeric_code": 643}}})
        );
    }

    #[test]
    fn test_find_object_and_refs_of() {
        let snapshot = Snapshot::parse(&checkout_reply()).unwrap();

        let found = snapshot
            .find_object(&ObjectKind::Category, &json!({"id": 2}))
            .unwrap();
        assert_eq!(found.payload["data"]["name"], "other");
        assert!(
            snapshot
                .find_object(&ObjectKind::Category, &json!({"id": 3}))
                .is_none()
        );

        assert_eq!(
            snapshot.refs_of(&ObjectKind::Category),
            vec![&json!({"id": 1}), &json!({"id": 2})]
        );
        assert!(snapshot.refs_of(&ObjectKind::Terminal).is_empty());
    }

    #[test]
    fn test_selector_values_nested_decisions() {
        let selector = json!({
            "decisions": [
                {"if_": {}, "then_": {"value": [{"id": 1}, {"id": 2}]}},
                {"if_": {}, "then_": {"decisions": [
                    {"if_": {}, "then_": {"value": [{"id": 2}, {"id": 3}]}}
                ]}}
            ]
        });
        assert_eq!(selector_values(&selector), vec![json!(1), json!(2), json!(3)]);
        assert!(selector_values(&json!({})).is_empty());
    }
}

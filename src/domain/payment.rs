use crate::error::{OpsError, Result};
use serde::Deserialize;
use serde_json::{Map, Value, json};

const DEFAULT_DUE: &str = "2030-12-31T23:59:59Z";

/// One input row for invoice creation and payment registration.
///
/// Every column is optional at the parsing level; [`PaymentRow::validate`]
/// decides which ones a given run requires.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct PaymentRow {
    pub invoice_id: Option<String>,
    pub party_id: Option<String>,
    pub shop_id: Option<String>,
    pub product: Option<String>,
    pub due: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub external_id: Option<String>,
    pub context_type: Option<String>,
    pub context_data: Option<String>,
    pub payment_id: Option<String>,
    pub provider_id: Option<String>,
    pub terminal_id: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub recurrent_token: Option<String>,
    pub card_token: Option<String>,
    pub card_bin: Option<String>,
    pub card_last_digits: Option<String>,
    pub card_payment_system: Option<String>,
    pub cardholder_name: Option<String>,
    pub card_exp_month: Option<String>,
    pub card_exp_year: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

impl PaymentRow {
    /// Checks required columns. Invoice columns are only required when the invoice is created.
    pub fn validate(&self, row: u64, with_invoice: bool) -> Result<()> {
        let mut required = vec![
            ("invoice_id", &self.invoice_id),
            ("amount", &self.amount),
            ("currency", &self.currency),
            ("provider_id", &self.provider_id),
            ("terminal_id", &self.terminal_id),
            ("provider_transaction_id", &self.provider_transaction_id),
            ("card_token", &self.card_token),
            ("card_bin", &self.card_bin),
            ("card_last_digits", &self.card_last_digits),
        ];
        if with_invoice {
            required.extend([
                ("party_id", &self.party_id),
                ("shop_id", &self.shop_id),
                ("product", &self.product),
            ]);
        }

        let missing: Vec<&str> = required
            .into_iter()
            .filter(|(_, value)| present(value).is_none())
            .map(|(name, _)| name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OpsError::InvalidRow {
                row,
                reason: format!("missing required fields: {}", missing.join(", ")),
            })
        }
    }

    pub fn invoice_id(&self) -> &str {
        present(&self.invoice_id).unwrap_or_default()
    }

    /// `InvoiceParams` for `Invoicing.Create`.
    pub fn invoice_params(&self, row: u64) -> Result<Value> {
        let mut params = json!({
            "party_id": {"id": present(&self.party_id).unwrap_or_default()},
            "shop_id": {"id": present(&self.shop_id).unwrap_or_default()},
            "details": {"product": present(&self.product).unwrap_or_default()},
            "due": present(&self.due).unwrap_or(DEFAULT_DUE),
            "cost": {
                "amount": parse_int(row, "amount", &self.amount)?,
                "currency": {"symbolic_code": present(&self.currency).unwrap_or_default()}
            },
            "context": {
                "type": present(&self.context_type).unwrap_or("empty"),
                "data": present(&self.context_data).unwrap_or_default()
            },
            "id": self.invoice_id()
        });
        if let Some(external_id) = present(&self.external_id) {
            params["external_id"] = json!(external_id);
        }
        Ok(params)
    }

    /// `RegisterInvoicePaymentParams` for `Invoicing.RegisterPayment`.
    pub fn payment_params(&self, row: u64) -> Result<Value> {
        let mut bank_card = json!({
            "token": present(&self.card_token).unwrap_or_default(),
            "bin": present(&self.card_bin).unwrap_or_default(),
            "last_digits": present(&self.card_last_digits).unwrap_or_default()
        });
        if let Some(system) = present(&self.card_payment_system) {
            bank_card["payment_system"] = json!({"id": system});
        }
        if let Some(name) = present(&self.cardholder_name) {
            bank_card["cardholder_name"] = json!(name);
        }
        if present(&self.card_exp_month).is_some() && present(&self.card_exp_year).is_some() {
            bank_card["exp_date"] = json!({
                "month": parse_int(row, "card_exp_month", &self.card_exp_month)?,
                "year": parse_int(row, "card_exp_year", &self.card_exp_year)?
            });
        }

        let mut contact_info = Map::new();
        if let Some(email) = present(&self.contact_email) {
            contact_info.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = present(&self.contact_phone) {
            contact_info.insert("phone_number".to_string(), json!(phone));
        }

        let mut params = json!({
            "payer_params": {
                "payment_resource": {
                    "resource": {"payment_tool": {"bank_card": bank_card}},
                    "contact_info": contact_info
                }
            },
            "route": {
                "provider": {"id": parse_int(row, "provider_id", &self.provider_id)?},
                "terminal": {"id": parse_int(row, "terminal_id", &self.terminal_id)?}
            },
            "transaction_info": {
                "id": present(&self.provider_transaction_id).unwrap_or_default(),
                "extra": {}
            }
        });
        if let Some(token) = present(&self.recurrent_token) {
            params["recurrent_token"] = json!(token);
        }
        if let Some(payment_id) = present(&self.payment_id) {
            params["id"] = json!(payment_id);
        }
        Ok(params)
    }
}

fn parse_int(row: u64, name: &str, field: &Option<String>) -> Result<i64> {
    let raw = present(field).unwrap_or_default();
    raw.trim().parse().map_err(|_| OpsError::InvalidRow {
        row,
        reason: format!("{name} must be an integer, got {raw:?}"),
    })
}

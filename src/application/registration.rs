use crate::domain::payment::PaymentRow;
use crate::domain::ports::{CallOutcome, RpcArg, RpcTransportBox};
use crate::domain::service::INVOICING;
use crate::error::{OpsError, Result};
use std::fmt;
use tracing::{error, info};

/// Counts of processed rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    pub succeeded: u64,
    pub failed: u64,
}

impl RegistrationSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RegistrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processing complete:")?;
        writeln!(f, "  Successful: {}", self.succeeded)?;
        write!(f, "  Failed: {}", self.failed)
    }
}

/// Creates invoices and registers already-processed payments against them.
///
/// Rows are handled one at a time; a bad row or a rejected call is counted
/// and skipped.
pub struct PaymentRegistrar {
    transport: RpcTransportBox,
    create_invoices: bool,
}

impl PaymentRegistrar {
    pub fn new(transport: RpcTransportBox) -> Self {
        Self {
            transport,
            create_invoices: true,
        }
    }

    /// Only register payments, for invoices that already exist.
    pub fn skip_invoice_creation(mut self, skip: bool) -> Self {
        self.create_invoices = !skip;
        self
    }

    /// Processes every row. Rows are numbered from 2, the header being line 1.
    ///
    /// # Errors
    ///
    /// Only a transport that cannot be started at all aborts the run.
    pub async fn register_all(
        &self,
        rows: impl IntoIterator<Item = Result<PaymentRow>>,
    ) -> Result<RegistrationSummary> {
        let mut summary = RegistrationSummary::default();

        for (line, row) in (2u64..).zip(rows) {
            let result = match row {
                Ok(row) => self.register(line, &row).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => summary.succeeded += 1,
                Err(e @ OpsError::Spawn { .. }) => return Err(e),
                Err(e) => {
                    error!(row = line, "{e}");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn register(&self, line: u64, row: &PaymentRow) -> Result<()> {
        row.validate(line, self.create_invoices)?;
        let invoice_id = row.invoice_id();

        if self.create_invoices {
            info!(invoice_id, "creating invoice");
            let params = row.invoice_params(line)?;
            self.call(line, "Create", &[RpcArg::Json(params)], "failed to create invoice")
                .await?;
        }

        info!(invoice_id, "registering payment");
        let params = row.payment_params(line)?;
        self.call(
            line,
            "RegisterPayment",
            &[RpcArg::json(invoice_id)?, RpcArg::Json(params)],
            "failed to register payment",
        )
        .await?;

        info!(invoice_id, "payment registered");
        Ok(())
    }

    async fn call(&self, line: u64, function: &str, args: &[RpcArg], reason: &str) -> Result<()> {
        match self.transport.call_tolerant(INVOICING, function, args).await? {
            CallOutcome::Completed(_) => Ok(()),
            CallOutcome::Failed => Err(OpsError::InvalidRow {
                row: line,
                reason: reason.to_string(),
            }),
        }
    }
}

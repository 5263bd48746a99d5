//! Diagnostics command implementation.

use anyhow::{Context, Result};

use aquasync_core::ServiceClient;
use aquasync_types::{DiagnosticKind, DiagnosticReport};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_report_text};

/// History records shown in text output.
const HISTORY_LINES: usize = 10;

/// Which report to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsAction {
    /// The stored report.
    Show,
    /// A fresh run of every check.
    RunAll,
    /// A fresh run of one check.
    Run(DiagnosticKind),
}

impl DiagnosticsAction {
    pub fn from_flags(run: bool, check: Option<DiagnosticKind>) -> Self {
        match (run, check) {
            (_, Some(kind)) => DiagnosticsAction::Run(kind),
            (true, None) => DiagnosticsAction::RunAll,
            (false, None) => DiagnosticsAction::Show,
        }
    }
}

/// Fetch a diagnostic report.
///
/// Returns the rendered report and whether every check passed.
pub async fn cmd_diagnostics(
    client: &ServiceClient,
    action: DiagnosticsAction,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<(String, bool)> {
    let report: DiagnosticReport = match action {
        DiagnosticsAction::Show => client.diagnostics().await,
        DiagnosticsAction::RunAll => client.run_diagnostics().await,
        DiagnosticsAction::Run(kind) => client.run_check(kind).await,
    }
    .context("Failed to fetch diagnostics")?;

    let content = match format {
        OutputFormat::Json => opts.as_json(&report)?,
        OutputFormat::Text => format_report_text(&report, HISTORY_LINES, opts),
    };
    Ok((content, report.all_passed()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_flags() {
        assert_eq!(
            DiagnosticsAction::from_flags(false, None),
            DiagnosticsAction::Show
        );
        assert_eq!(
            DiagnosticsAction::from_flags(true, None),
            DiagnosticsAction::RunAll
        );
        assert_eq!(
            DiagnosticsAction::from_flags(false, Some(DiagnosticKind::DataIntegrity)),
            DiagnosticsAction::Run(DiagnosticKind::DataIntegrity)
        );
    }
}

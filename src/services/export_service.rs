use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};

use crate::error::{ExportError, GatewayError};
use crate::gateway::{paths, ApiRequest, RequestGateway};
use crate::session::ExportHistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            ExportFormat::Csv => paths::EXPORT_CSV,
            ExportFormat::Pdf => paths::EXPORT_PDF,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named reporting windows understood by the export endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPeriod {
    Today,
    Yesterday,
    Week,
    LastWeek,
    Month,
    LastMonth,
    Quarter,
    Year,
    LastYear,
    All,
    Custom,
}

impl ExportPeriod {
    pub const ALL: [ExportPeriod; 11] = [
        ExportPeriod::Today,
        ExportPeriod::Yesterday,
        ExportPeriod::Week,
        ExportPeriod::LastWeek,
        ExportPeriod::Month,
        ExportPeriod::LastMonth,
        ExportPeriod::Quarter,
        ExportPeriod::Year,
        ExportPeriod::LastYear,
        ExportPeriod::All,
        ExportPeriod::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportPeriod::Today => "today",
            ExportPeriod::Yesterday => "yesterday",
            ExportPeriod::Week => "week",
            ExportPeriod::LastWeek => "last_week",
            ExportPeriod::Month => "month",
            ExportPeriod::LastMonth => "last_month",
            ExportPeriod::Quarter => "quarter",
            ExportPeriod::Year => "year",
            ExportPeriod::LastYear => "last_year",
            ExportPeriod::All => "all",
            ExportPeriod::Custom => "custom",
        }
    }

    /// Filename form, e.g. `last-week`
    pub fn label(&self) -> String {
        self.as_str().replace('_', "-")
    }

    /// Inclusive window ending at `today`. `All` and `Custom` have no fixed window.
    /// Weeks start on Monday.
    pub fn date_range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let since_monday = i64::from(today.weekday().num_days_from_monday());
        let first_of_month = today.with_day(1)?;

        let range = match self {
            ExportPeriod::Today => (today, today),
            ExportPeriod::Yesterday => {
                let day = today - Duration::days(1);
                (day, day)
            }
            ExportPeriod::Week => (today - Duration::days(since_monday), today),
            ExportPeriod::LastWeek => (
                today - Duration::days(since_monday + 7),
                today - Duration::days(since_monday + 1),
            ),
            ExportPeriod::Month => (first_of_month, today),
            ExportPeriod::LastMonth => {
                let end = first_of_month - Duration::days(1);
                (end.with_day(1)?, end)
            }
            ExportPeriod::Quarter => {
                let month = (today.month0() / 3) * 3 + 1;
                (NaiveDate::from_ymd_opt(today.year(), month, 1)?, today)
            }
            ExportPeriod::Year => (NaiveDate::from_ymd_opt(today.year(), 1, 1)?, today),
            ExportPeriod::LastYear => (
                NaiveDate::from_ymd_opt(today.year() - 1, 1, 1)?,
                NaiveDate::from_ymd_opt(today.year() - 1, 12, 31)?,
            ),
            ExportPeriod::All | ExportPeriod::Custom => return None,
        };
        Some(range)
    }
}

impl FromStr for ExportPeriod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ExportPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| GatewayError::validation(format!("Unknown export period: {}", s)))
    }
}

impl fmt::Display for ExportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one export download
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub period: ExportPeriod,
    /// Only sent for `Custom`
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub payment_mode_id: Option<i64>,
    /// `detailed` or `summary`; the CSV endpoint ignores it
    pub report_type: String,
    pub include_summary: bool,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, period: ExportPeriod) -> Self {
        Self {
            format,
            period,
            start_date: None,
            end_date: None,
            category_id: None,
            payment_mode_id: None,
            report_type: "detailed".to_string(),
            include_summary: true,
        }
    }

    pub fn custom(format: ExportFormat, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start_date: start,
            end_date: end,
            ..Self::new(format, ExportPeriod::Custom)
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if self.period == ExportPeriod::Custom && start > end {
                return Err(GatewayError::validation("Start date must be before end date"));
            }
        }
        match self.report_type.as_str() {
            "detailed" | "summary" => Ok(()),
            other => Err(GatewayError::validation(format!("Unknown report type: {}", other))),
        }
    }

    pub fn to_api_request(&self) -> ApiRequest {
        let mut request = ApiRequest::get(self.format.path())
            .query("period", self.period)
            .query_opt("category_id", self.category_id)
            .query_opt("payment_mode_id", self.payment_mode_id)
            .query("include_summary", self.include_summary);

        if self.period == ExportPeriod::Custom {
            request = request
                .query_opt("start_date", self.start_date)
                .query_opt("end_date", self.end_date);
        }
        if self.format == ExportFormat::Pdf {
            request = request.query("report_type", &self.report_type);
        }
        request
    }

    /// Name used when the server does not send one
    pub fn default_filename(&self, at: DateTime<Local>) -> String {
        let stamp = at.format("%Y%m%d_%H%M%S");
        match self.format {
            ExportFormat::Csv => format!("expenses_{}_{}.csv", self.period.label(), stamp),
            ExportFormat::Pdf => format!(
                "expense_report_{}_{}_{}.pdf",
                self.report_type,
                self.period.label(),
                stamp
            ),
        }
    }
}

/// A saved export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: usize,
}

/// Downloaded export not yet written anywhere
#[derive(Debug, Clone)]
pub struct ExportBlob {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExportService {
    gateway: RequestGateway,
}

impl ExportService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn download(&self, request: &ExportRequest) -> Result<ExportBlob, GatewayError> {
        request.validate()?;
        let response = self.gateway.get_blob(request.to_api_request()).await?;

        let filename = response
            .attachment_filename()
            .and_then(|name| safe_filename(&name))
            .unwrap_or_else(|| request.default_filename(Local::now()));

        Ok(ExportBlob {
            filename,
            content_type: response.content_type,
            bytes: response.body,
        })
    }

    /// Download, write into `dir`, then append to the export history.
    /// History is only touched once the file is on disk.
    pub async fn export_to(&self, request: &ExportRequest, dir: &Path) -> Result<ExportedFile, ExportError> {
        let blob = self.download(request).await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&blob.filename);
        tokio::fs::write(&path, &blob.bytes).await?;

        self.gateway.session().record_export(ExportHistoryEntry {
            format: request.format.as_str().to_string(),
            report_type: request.report_type.clone(),
            period: request.period.as_str().to_string(),
            filename: blob.filename.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!("Exported {} ({} bytes)", path.display(), blob.bytes.len());

        Ok(ExportedFile {
            path,
            filename: blob.filename,
            size: blob.bytes.len(),
        })
    }
}

// Server-supplied names are reduced to their last path component
fn safe_filename(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}

use chrono::{DateTime, Utc};

/// A registry resource holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
  pub id: String,
  pub name: String,
  pub country: Option<String>,
  pub created: Option<DateTime<Utc>>,
}

/// A registered IP address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
  pub inetnum: String,
  pub netname: String,
  pub country: Option<String>,
  /// Holder organisation id. Not guaranteed to be cached.
  pub organization_id: String,
}

/// Date format used when showing creation dates to users.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

impl Organization {
  /// Creation date as `dd.mm.yyyy`.
  pub fn created_display(&self) -> Option<String> {
    self
      .created
      .map(|created| created.format(DISPLAY_DATE_FORMAT).to_string())
  }
}

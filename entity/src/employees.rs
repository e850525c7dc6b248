use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub title: Option<String>,
    pub status: Status,
    pub avatar_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(
    Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "Working")]
    Working,
    #[sea_orm(string_value = "OnVacation")]
    OnVacation,
    #[sea_orm(string_value = "LunchTime")]
    LunchTime,
    #[sea_orm(string_value = "BusinessTrip")]
    BusinessTrip,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Working,
        Status::OnVacation,
        Status::LunchTime,
        Status::BusinessTrip,
    ];

    /// Wire and column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Working => "Working",
            Status::OnVacation => "OnVacation",
            Status::LunchTime => "LunchTime",
            Status::BusinessTrip => "BusinessTrip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_exact_variant_names_only() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("working"), None);
        assert_eq!(Status::parse("On Vacation"), None);
        assert_eq!(Status::parse(""), None);
    }

    #[test]
    fn default_status_is_working() {
        assert_eq!(Status::default(), Status::Working);
    }
}

//! Column semantic resolver.
//!
//! Maps unpredictable column names to the logical roles every dashboard
//! needs, without user-supplied schema configuration. Matching is alias-based
//! and case-insensitive: for each role the alias list is walked in priority
//! order and the first alias contained in any column name wins. Roles are
//! resolved independently, so two roles may land on the same column; that is
//! accepted silently. No fuzzy matching, no value inspection, never fails.

use crate::dataset::Dataset;
use crate::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical role a column can be mapped to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Sales,
    Quantity,
    Brand,
    Sku,
    Outlet,
    Price,
    Discount,
    Rep,
    City,
    State,
    Warehouse,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Date,
        Role::Sales,
        Role::Quantity,
        Role::Brand,
        Role::Sku,
        Role::Outlet,
        Role::Price,
        Role::Discount,
        Role::Rep,
        Role::City,
        Role::State,
        Role::Warehouse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Sales => "sales",
            Role::Quantity => "quantity",
            Role::Brand => "brand",
            Role::Sku => "sku",
            Role::Outlet => "outlet",
            Role::Price => "price",
            Role::Discount => "discount",
            Role::Rep => "rep",
            Role::City => "city",
            Role::State => "state",
            Role::Warehouse => "warehouse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Role::Date),
            "sales" => Some(Role::Sales),
            "quantity" => Some(Role::Quantity),
            "brand" => Some(Role::Brand),
            "sku" => Some(Role::Sku),
            "outlet" => Some(Role::Outlet),
            "price" => Some(Role::Price),
            "discount" => Some(Role::Discount),
            "rep" => Some(Role::Rep),
            "city" => Some(Role::City),
            "state" => Some(Role::State),
            "warehouse" => Some(Role::Warehouse),
            _ => None,
        }
    }

    /// Candidate aliases in priority order. Earlier aliases win even when a
    /// later alias would also match some column.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Role::Date => &["date", "order_date", "invoice_date", "bill_date", "txn_date"],
            Role::Sales => &[
                "sales",
                "amount",
                "total_sales",
                "revenue",
                "net_sales",
                "sales_value",
            ],
            Role::Quantity => &["quantity", "qty", "units", "volume"],
            Role::Brand => &["brand"],
            Role::Sku => &["sku", "product", "item"],
            Role::Outlet => &["outlet", "store", "retailer", "customer"],
            Role::Price => &["price", "unit_price", "rate", "mrp"],
            Role::Discount => &["discount", "rebate", "promo_amount"],
            Role::Rep => &["rep", "salesman", "agent", "employee"],
            Role::City => &["city", "town"],
            Role::State => &["state", "province"],
            Role::Warehouse => &["warehouse", "depot", "plant"],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mapping from roles to detected column names. Built fresh per dataset and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    mapping: BTreeMap<Role, String>,
}

impl ColumnMap {
    /// Detected column for a role, if any.
    pub fn get(&self, role: Role) -> Option<&str> {
        self.mapping.get(&role).map(|s| s.as_str())
    }

    /// Detected column for a role, or a caller-visible missing-column error.
    pub fn require(&self, role: Role) -> Result<&str, AnalyticsError> {
        self.get(role).ok_or(AnalyticsError::MissingColumn(role))
    }

    /// Roles from the given set that were not detected.
    pub fn missing(&self, required: &[Role]) -> Vec<Role> {
        required
            .iter()
            .copied()
            .filter(|r| self.get(*r).is_none())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.mapping.iter().map(|(r, c)| (*r, c.as_str()))
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: Vec<(Role, &str)>) -> Self {
        Self {
            mapping: pairs
                .into_iter()
                .map(|(r, c)| (r, c.to_string()))
                .collect(),
        }
    }
}

/// Resolve every role against the dataset's column names.
///
/// Pure function over column names; values are never inspected. Missing roles
/// simply stay absent and calling pages decide whether that halts them.
pub fn resolve_columns(dataset: &Dataset) -> ColumnMap {
    let names: Vec<(String, String)> = dataset
        .column_names()
        .map(|n| (n.to_string(), n.to_lowercase()))
        .collect();

    let mut mapping = BTreeMap::new();
    for role in Role::ALL {
        'role: for alias in role.aliases() {
            for (original, lowered) in &names {
                if lowered.contains(alias) {
                    mapping.insert(role, original.clone());
                    break 'role;
                }
            }
        }
    }

    ColumnMap { mapping }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    fn dataset_with_columns(names: &[&str]) -> Dataset {
        Dataset::from_columns(
            names
                .iter()
                .map(|n| (n.to_string(), Vec::<Value>::new()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_resolves_case_insensitively() {
        let ds = dataset_with_columns(&["Order_Date", "Total_Amount", "Outlet_Name"]);
        let map = resolve_columns(&ds);
        assert_eq!(map.get(Role::Date), Some("Order_Date"));
        assert_eq!(map.get(Role::Sales), Some("Total_Amount"));
        assert_eq!(map.get(Role::Outlet), Some("Outlet_Name"));
    }

    #[test]
    fn test_missing_roles_stay_absent() {
        let ds = dataset_with_columns(&["foo", "bar"]);
        let map = resolve_columns(&ds);
        for role in Role::ALL {
            assert_eq!(map.get(role), None, "role {} should be absent", role);
        }
        assert_eq!(
            map.missing(&[Role::Date, Role::Sales]),
            vec![Role::Date, Role::Sales]
        );
    }

    #[test]
    fn test_first_alias_priority_wins() {
        // "sales" is an earlier alias than "amount"; both columns match.
        let ds = dataset_with_columns(&["amount", "net_sales_value"]);
        let map = resolve_columns(&ds);
        assert_eq!(map.get(Role::Sales), Some("net_sales_value"));
    }

    #[test]
    fn test_column_order_breaks_ties_within_alias() {
        let ds = dataset_with_columns(&["sales_east", "sales_west"]);
        let map = resolve_columns(&ds);
        assert_eq!(map.get(Role::Sales), Some("sales_east"));
    }

    #[test]
    fn test_collisions_are_silently_accepted() {
        // One column matches both quantity and sales-by-volume style names.
        let ds = dataset_with_columns(&["sales_volume"]);
        let map = resolve_columns(&ds);
        assert_eq!(map.get(Role::Sales), Some("sales_volume"));
        assert_eq!(map.get(Role::Quantity), Some("sales_volume"));
    }

    #[test]
    fn test_require_surfaces_missing_column() {
        let ds = dataset_with_columns(&["sales"]);
        let map = resolve_columns(&ds);
        assert!(map.require(Role::Sales).is_ok());
        let err = map.require(Role::Date).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn(Role::Date)));
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn test_empty_dataset_resolves_to_nothing() {
        let map = resolve_columns(&Dataset::default());
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("unknown"), None);
    }
}

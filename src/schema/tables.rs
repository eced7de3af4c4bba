//! Table schema definitions for the carpark store

use super::types::*;

/// Current availability, one row per carpark and lot type.
///
/// `last_seen_at` is the staleness clock: the timestamp of the last pass
/// that reported the row.
pub static AVAILABILITY: TableSchema = TableSchema {
    name: "carpark_availability",
    columns: &[
        Column::required("carpark_number", ColumnType::Text),
        Column::required("lot_type", ColumnType::Text),
        Column::required("lots_available", ColumnType::Integer),
        Column::new("total_lots", ColumnType::Integer),
        Column::required("update_datetime", ColumnType::Text),
        Column::required("last_seen_at", ColumnType::Text),
    ],
    primary_key: &["carpark_number", "lot_type"],
    indexes: &[Index::on(&["carpark_number"]), Index::on(&["last_seen_at"])],
};

/// Append-only measurement log.
pub static AVAILABILITY_HISTORY: TableSchema = TableSchema {
    name: "carpark_availability_history",
    columns: &[
        Column::row_id("id"),
        Column::required("carpark_number", ColumnType::Text),
        Column::required("lot_type", ColumnType::Text),
        Column::required("lots_available", ColumnType::Integer),
        Column::required("update_datetime", ColumnType::Text),
        Column::required("retrieved_at", ColumnType::Text),
    ],
    primary_key: &[],
    indexes: &[
        Index::unique(&["carpark_number", "lot_type", "update_datetime", "retrieved_at"]),
        Index::on(&["update_datetime"]),
    ],
};

/// Slowly-changing carpark metadata.
pub static CARPARK_INFO: TableSchema = TableSchema {
    name: "carpark_info",
    columns: &[
        Column::required("carpark_number", ColumnType::Text),
        Column::new("address", ColumnType::Text),
        Column::new("x_coord", ColumnType::Text),
        Column::new("y_coord", ColumnType::Text),
        Column::required("updated_at", ColumnType::Text),
    ],
    primary_key: &["carpark_number"],
    indexes: &[],
};

/// Denormalized availability joined with carpark metadata.
pub static AVAILABILITY_JOIN: TableSchema = TableSchema {
    name: "carpark_availability_join",
    columns: &[
        Column::required("carpark_number", ColumnType::Text),
        Column::required("lot_type", ColumnType::Text),
        Column::new("lots_available", ColumnType::Integer),
        Column::new("total_lots", ColumnType::Integer),
        Column::new("update_datetime", ColumnType::Text),
        Column::new("address", ColumnType::Text),
        Column::new("x_coord", ColumnType::Text),
        Column::new("y_coord", ColumnType::Text),
        Column::required("has_info", ColumnType::Integer),
    ],
    primary_key: &["carpark_number", "lot_type"],
    indexes: &[],
};

pub static ALL_TABLES: &[&TableSchema] = &[
    &AVAILABILITY,
    &AVAILABILITY_HISTORY,
    &CARPARK_INFO,
    &AVAILABILITY_JOIN,
];

/// Get all table names
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}

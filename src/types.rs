/// Column name after canonicalization.
/// Examples: `start_dt`, `lat1`, `dist_mi`, `bikeid`
pub type FieldName = String;
/// Raw column header as read from a source file.
/// Examples: `Start Time`, `starttime`, `started_at`
pub type RawColumnName = String;
/// Station identifier (station name in every known schema revision).
/// Example: `W 21 St & 6 Ave`
pub type StationId = String;
/// Raw cell text as read from a source file; `None` for empty cells.
pub type RawCell = Option<String>;
/// Human-readable byte size.
/// Examples: `0B`, `1.5 KB`, `12.31 MB`
pub type ByteSize = String;

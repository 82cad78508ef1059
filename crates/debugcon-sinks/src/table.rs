use debugcon_abstract::{AbsKind, Abstraction};

/// Synthesized column holding the row's type name when rows mix
/// object-like and array-like shapes
pub const TYPE_COLUMN: &str = "___type";
/// Column used when a row is a bare scalar
pub const VALUE_COLUMN: &str = "value";

/// Uniform grid built from heterogeneous row shapes
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Row label: map key or positional index
    pub key: String,
    /// One cell per column, `Undefined` where the row had no such field
    pub cells: Vec<Abstraction>,
}

/// Normalize a table argument into a uniform column set.
///
/// Returns `None` when the value has no tabular interpretation at all
/// (scalar, recursion stub); callers fall back to the default renderer.
pub fn build(data: &Abstraction) -> Option<TableLayout> {
    let rows: Vec<(String, &Abstraction)> = match &data.kind {
        AbsKind::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        AbsKind::Map(entries) => entries
            .iter()
            .map(|(key, item)| (key.to_string(), item))
            .collect(),
        _ => return None,
    };
    if rows.is_empty() {
        return None;
    }

    let mut saw_object = false;
    let mut saw_collection = false;
    for (_, row) in &rows {
        match &row.kind {
            AbsKind::Object(_) => saw_object = true,
            AbsKind::Array(_) | AbsKind::Map(_) => saw_collection = true,
            _ => {}
        }
    }
    let with_type_column = saw_object && saw_collection;

    // Column set: union of row field names in first-seen order
    let mut columns: Vec<String> = Vec::new();
    if with_type_column {
        columns.push(TYPE_COLUMN.to_string());
    }
    for (_, row) in &rows {
        for name in row_field_names(row) {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }

    let rows = rows
        .into_iter()
        .map(|(key, row)| {
            let cells = columns
                .iter()
                .map(|column| cell_for(row, column, with_type_column))
                .collect();
            TableRow { key, cells }
        })
        .collect();

    Some(TableLayout { columns, rows })
}

fn row_field_names(row: &Abstraction) -> Vec<String> {
    match &row.kind {
        AbsKind::Map(entries) => entries.iter().map(|(k, _)| k.to_string()).collect(),
        AbsKind::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        AbsKind::Object(obj) => obj.properties.iter().map(|p| p.name.clone()).collect(),
        _ => vec![VALUE_COLUMN.to_string()],
    }
}

fn cell_for(row: &Abstraction, column: &str, with_type_column: bool) -> Abstraction {
    if with_type_column && column == TYPE_COLUMN {
        let label = match &row.kind {
            AbsKind::Object(obj) => obj.class_name.clone(),
            _ => row.type_name().to_string(),
        };
        return Abstraction::string(label);
    }
    let found = match &row.kind {
        AbsKind::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.to_string() == column)
            .map(|(_, v)| v.clone()),
        AbsKind::Array(items) => column
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned()),
        AbsKind::Object(obj) => obj
            .properties
            .iter()
            .find(|p| p.name == column)
            .map(|p| p.value.clone()),
        _ if column == VALUE_COLUMN => Some(row.clone()),
        _ => None,
    };
    found.unwrap_or_else(|| Abstraction::of(AbsKind::Undefined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugcon_abstract::{ObjectAbs, PropertyAbs};
    use debugcon_types::{MapKey, Visibility};

    fn map_row(pairs: &[(&str, i64)]) -> Abstraction {
        Abstraction::of(AbsKind::Map(
            pairs
                .iter()
                .map(|(k, v)| (MapKey::from(*k), Abstraction::of(AbsKind::Int(*v))))
                .collect(),
        ))
    }

    fn object_row(class: &str, pairs: &[(&str, i64)]) -> Abstraction {
        Abstraction::of(AbsKind::Object(ObjectAbs {
            class_name: class.to_string(),
            properties: pairs
                .iter()
                .map(|(k, v)| PropertyAbs {
                    name: k.to_string(),
                    value: Abstraction::of(AbsKind::Int(*v)),
                    visibility: Visibility::Public,
                    declared_in: None,
                })
                .collect(),
            methods: Vec::new(),
        }))
    }

    #[test]
    fn union_columns_fill_missing_with_undefined() {
        let data = Abstraction::of(AbsKind::Array(vec![
            map_row(&[("a", 1), ("b", 2)]),
            map_row(&[("b", 3), ("c", 4)]),
        ]));
        let layout = build(&data).unwrap();
        assert_eq!(layout.columns, vec!["a", "b", "c"]);

        let row2 = &layout.rows[1];
        assert_eq!(row2.cells[0].kind, AbsKind::Undefined);
        assert_eq!(row2.cells[1].kind, AbsKind::Int(3));
    }

    #[test]
    fn mixed_rows_get_type_column() {
        let data = Abstraction::of(AbsKind::Array(vec![
            object_row("User", &[("id", 1)]),
            map_row(&[("id", 2)]),
        ]));
        let layout = build(&data).unwrap();
        assert_eq!(layout.columns[0], TYPE_COLUMN);

        let first_cell = &layout.rows[0].cells[0];
        assert_eq!(first_cell.kind, AbsKind::Str("User".to_string()));
        let second_cell = &layout.rows[1].cells[0];
        assert_eq!(second_cell.kind, AbsKind::Str("array".to_string()));
    }

    #[test]
    fn homogeneous_rows_skip_type_column() {
        let data = Abstraction::of(AbsKind::Array(vec![
            map_row(&[("x", 1)]),
            map_row(&[("x", 2)]),
        ]));
        let layout = build(&data).unwrap();
        assert_eq!(layout.columns, vec!["x"]);
    }

    #[test]
    fn scalar_rows_use_value_column() {
        let data = Abstraction::of(AbsKind::Array(vec![
            Abstraction::of(AbsKind::Int(1)),
            Abstraction::string("two"),
        ]));
        let layout = build(&data).unwrap();
        assert_eq!(layout.columns, vec![VALUE_COLUMN]);
        assert_eq!(layout.rows.len(), 2);
    }

    #[test]
    fn scalar_input_is_not_tabular() {
        assert!(build(&Abstraction::of(AbsKind::Int(5))).is_none());
        assert!(build(&Abstraction::of(AbsKind::Array(Vec::new()))).is_none());
    }
}

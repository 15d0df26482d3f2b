use std::fmt;

/// One label of an enum type. The label is stored as the quoted SQL literal
/// (e.g. `'was'` or `x'c328'`) so it can be emitted both in type declarations
/// and as a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub label: String,
    pub number: i32,
}

/// Tuple element, optionally named `c<N>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleField {
    pub name: Option<u32>,
    pub ftype: SqlType,
}

/// Nested element, always named `c<N>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedField {
    pub name: u32,
    pub ftype: SqlType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeoKind {
    Point,
    Ring,
    LineString,
    Polygon,
    MultiLineString,
    MultiPolygon,
}

impl GeoKind {
    pub const ALL: [GeoKind; 6] = [
        GeoKind::Point,
        GeoKind::Ring,
        GeoKind::LineString,
        GeoKind::Polygon,
        GeoKind::MultiLineString,
        GeoKind::MultiPolygon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GeoKind::Point => "Point",
            GeoKind::Ring => "Ring",
            GeoKind::LineString => "LineString",
            GeoKind::Polygon => "Polygon",
            GeoKind::MultiLineString => "MultiLineString",
            GeoKind::MultiPolygon => "MultiPolygon",
        }
    }
}

/// The SQL type tree. Composites own their subtypes, so `Clone` is a deep
/// copy and `PartialEq` is structural equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    Int {
        bits: u32,
        signed: bool,
    },
    Float {
        bits: u32,
    },
    Date {
        extended: bool,
    },
    DateTime {
        extended: bool,
        precision: Option<u32>,
        timezone: Option<String>,
    },
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    String {
        fixed_len: Option<u32>,
    },
    Uuid,
    IPv4,
    IPv6,
    Enum {
        bits: u32,
        values: Vec<EnumValue>,
    },
    Dynamic {
        max_types: Option<u32>,
    },
    /// The descriptor carries the rendered parameter list, including the
    /// surrounding parentheses when present, e.g.
    /// `(max_dynamic_paths=8, `a`.`b` Int32)`.
    Json {
        spec: String,
    },
    Nullable(Box<SqlType>),
    LowCardinality(Box<SqlType>),
    Array(Box<SqlType>),
    Map {
        key: Box<SqlType>,
        value: Box<SqlType>,
    },
    Tuple(Vec<TupleField>),
    Variant(Vec<SqlType>),
    Nested(Vec<NestedField>),
    Geo(GeoKind),
}

impl SqlType {
    /// True for types the generator treats as non-composite.
    pub fn is_bottom(&self) -> bool {
        !matches!(
            self,
            SqlType::Nullable(_)
                | SqlType::LowCardinality(_)
                | SqlType::Array(_)
                | SqlType::Map { .. }
                | SqlType::Tuple(_)
                | SqlType::Variant(_)
                | SqlType::Nested(_)
                | SqlType::Geo(_)
        )
    }

    /// The type with `Nullable`/`LowCardinality` wrappers stripped.
    pub fn unwrapped(&self) -> &SqlType {
        match self {
            SqlType::Nullable(inner) | SqlType::LowCardinality(inner) => inner.unwrapped(),
            other => other,
        }
    }

    pub fn contains_uuid(&self) -> bool {
        match self {
            SqlType::Uuid => true,
            SqlType::Nullable(t) | SqlType::LowCardinality(t) | SqlType::Array(t) => {
                t.contains_uuid()
            }
            SqlType::Map { key, value } => key.contains_uuid() || value.contains_uuid(),
            SqlType::Tuple(fields) => fields.iter().any(|f| f.ftype.contains_uuid()),
            SqlType::Variant(subs) => subs.iter().any(|t| t.contains_uuid()),
            SqlType::Nested(fields) => fields.iter().any(|f| f.ftype.contains_uuid()),
            _ => false,
        }
    }

    /// Canonical rendering. With `escape` set, single quotes inside the type
    /// (timezones, enum labels) are backslash-escaped, for embedding the
    /// rendered type inside an outer string literal such as a file table
    /// function structure argument.
    pub fn render(&self, escape: bool, out: &mut String) {
        let quote = if escape { "\\'" } else { "'" };
        match self {
            SqlType::Bool => out.push_str("Bool"),
            SqlType::Int { bits, signed } => {
                if !signed {
                    out.push('U');
                }
                out.push_str("Int");
                out.push_str(&bits.to_string());
            }
            SqlType::Float { bits } => {
                out.push_str("Float");
                out.push_str(&bits.to_string());
            }
            SqlType::Date { extended } => {
                out.push_str(if *extended { "Date32" } else { "Date" });
            }
            SqlType::DateTime {
                extended,
                precision,
                timezone,
            } => {
                if *extended {
                    out.push_str("DateTime64");
                    match (precision, timezone) {
                        (None, None) => {}
                        (Some(p), None) => out.push_str(&format!("({p})")),
                        (p, Some(tz)) => out.push_str(&format!(
                            "({}, {quote}{tz}{quote})",
                            p.unwrap_or(3)
                        )),
                    }
                } else {
                    out.push_str("DateTime");
                    if let Some(tz) = timezone {
                        out.push_str(&format!("({quote}{tz}{quote})"));
                    }
                }
            }
            SqlType::Decimal { precision, scale } => {
                out.push_str("Decimal");
                match (precision, scale) {
                    (None, _) => {}
                    (Some(p), None) => out.push_str(&format!("({p})")),
                    (Some(p), Some(s)) => out.push_str(&format!("({p}, {s})")),
                }
            }
            SqlType::String { fixed_len } => match fixed_len {
                Some(n) => out.push_str(&format!("FixedString({n})")),
                None => out.push_str("String"),
            },
            SqlType::Uuid => out.push_str("UUID"),
            SqlType::IPv4 => out.push_str("IPv4"),
            SqlType::IPv6 => out.push_str("IPv6"),
            SqlType::Enum { bits, values } => {
                out.push_str(&format!("Enum{bits}("));
                for (i, ev) in values.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    if escape {
                        out.push_str(&ev.label.replace('\'', "\\'"));
                    } else {
                        out.push_str(&ev.label);
                    }
                    out.push_str(&format!(" = {}", ev.number));
                }
                out.push(')');
            }
            SqlType::Dynamic { max_types } => {
                out.push_str("Dynamic");
                if let Some(n) = max_types {
                    out.push_str(&format!("(max_types={n})"));
                }
            }
            SqlType::Json { spec } => {
                out.push_str("JSON");
                if escape {
                    out.push_str(&spec.replace('\'', "\\'"));
                } else {
                    out.push_str(spec);
                }
            }
            SqlType::Nullable(inner) => {
                out.push_str("Nullable(");
                inner.render(escape, out);
                out.push(')');
            }
            SqlType::LowCardinality(inner) => {
                out.push_str("LowCardinality(");
                inner.render(escape, out);
                out.push(')');
            }
            SqlType::Array(inner) => {
                out.push_str("Array(");
                inner.render(escape, out);
                out.push(')');
            }
            SqlType::Map { key, value } => {
                out.push_str("Map(");
                key.render(escape, out);
                out.push_str(", ");
                value.render(escape, out);
                out.push(')');
            }
            SqlType::Tuple(fields) => {
                out.push_str("Tuple(");
                for (i, field) in fields.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    if let Some(name) = field.name {
                        out.push_str(&format!("c{name} "));
                    }
                    field.ftype.render(escape, out);
                }
                out.push(')');
            }
            SqlType::Variant(subs) => {
                out.push_str("Variant(");
                for (i, sub) in subs.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    sub.render(escape, out);
                }
                out.push(')');
            }
            SqlType::Nested(fields) => {
                out.push_str("Nested(");
                for (i, field) in fields.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format!("c{} ", field.name));
                    field.ftype.render(escape, out);
                }
                out.push(')');
            }
            SqlType::Geo(kind) => out.push_str(kind.name()),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(false, &mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scalars() {
        assert_eq!(
            SqlType::Int {
                bits: 32,
                signed: true
            }
            .to_string(),
            "Int32"
        );
        assert_eq!(
            SqlType::Int {
                bits: 256,
                signed: false
            }
            .to_string(),
            "UInt256"
        );
        assert_eq!(SqlType::Float { bits: 64 }.to_string(), "Float64");
        assert_eq!(SqlType::Date { extended: true }.to_string(), "Date32");
        assert_eq!(
            SqlType::String { fixed_len: Some(8) }.to_string(),
            "FixedString(8)"
        );
        assert_eq!(
            SqlType::Decimal {
                precision: Some(7),
                scale: Some(2)
            }
            .to_string(),
            "Decimal(7, 2)"
        );
    }

    #[test]
    fn test_render_composites() {
        let t = SqlType::Array(Box::new(SqlType::Nullable(Box::new(SqlType::String {
            fixed_len: None,
        }))));
        assert_eq!(t.to_string(), "Array(Nullable(String))");

        let m = SqlType::Map {
            key: Box::new(SqlType::Uuid),
            value: Box::new(SqlType::Bool),
        };
        assert_eq!(m.to_string(), "Map(UUID, Bool)");

        let tup = SqlType::Tuple(vec![
            TupleField {
                name: Some(0),
                ftype: SqlType::Bool,
            },
            TupleField {
                name: Some(1),
                ftype: SqlType::IPv4,
            },
        ]);
        assert_eq!(tup.to_string(), "Tuple(c0 Bool, c1 IPv4)");
    }

    #[test]
    fn test_render_datetime_with_timezone_escaped() {
        let t = SqlType::DateTime {
            extended: true,
            precision: Some(6),
            timezone: Some("Asia/Tokyo".to_string()),
        };
        assert_eq!(t.to_string(), "DateTime64(6, 'Asia/Tokyo')");
        let mut escaped = String::new();
        t.render(true, &mut escaped);
        assert_eq!(escaped, "DateTime64(6, \\'Asia/Tokyo\\')");
    }

    #[test]
    fn test_clone_is_deep_and_eq_structural() {
        let t = SqlType::Map {
            key: Box::new(SqlType::String { fixed_len: None }),
            value: Box::new(SqlType::Array(Box::new(SqlType::Int {
                bits: 64,
                signed: true,
            }))),
        };
        let copy = t.clone();
        assert_eq!(t, copy);
        assert_ne!(
            copy,
            SqlType::Map {
                key: Box::new(SqlType::String { fixed_len: None }),
                value: Box::new(SqlType::Array(Box::new(SqlType::Int {
                    bits: 64,
                    signed: false,
                }))),
            }
        );
    }

    #[test]
    fn test_unwrapped_strips_wrappers() {
        let t = SqlType::LowCardinality(Box::new(SqlType::Nullable(Box::new(SqlType::Uuid))));
        assert_eq!(*t.unwrapped(), SqlType::Uuid);
        assert!(t.contains_uuid());
    }
}

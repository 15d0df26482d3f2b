use std::collections::BTreeSet;

use crate::random::RandomGenerator;
use crate::types::{EnumValue, GeoKind, NestedField, SqlType, TupleField};

/// Capability bits controlling which type classes the generator may emit at a
/// given recursion site. Stripping a bit at a recursion site is how the
/// wrapper invariants (no `Nullable(Nullable)`, no `Nested` inside
/// composites, ...) are enforced by construction.
pub mod mask {
    pub const INT8: u32 = 1 << 0;
    pub const HUGE_INT: u32 = 1 << 1;
    pub const UNSIGNED_INT: u32 = 1 << 2;
    pub const FLOAT: u32 = 1 << 3;
    pub const DATE: u32 = 1 << 4;
    pub const DATE32: u32 = 1 << 5;
    pub const DATETIME: u32 = 1 << 6;
    pub const DATETIME64: u32 = 1 << 7;
    pub const STRING: u32 = 1 << 8;
    pub const DECIMAL: u32 = 1 << 9;
    pub const BOOL: u32 = 1 << 10;
    pub const ENUM: u32 = 1 << 11;
    pub const UUID: u32 = 1 << 12;
    pub const IPV4: u32 = 1 << 13;
    pub const IPV6: u32 = 1 << 14;
    pub const JSON: u32 = 1 << 15;
    pub const DYNAMIC: u32 = 1 << 16;
    pub const NULLABLE: u32 = 1 << 17;
    pub const NULLABLE_INSIDE_ARRAY: u32 = 1 << 18;
    pub const LOW_CARDINALITY: u32 = 1 << 19;
    pub const ARRAY: u32 = 1 << 20;
    pub const MAP: u32 = 1 << 21;
    pub const TUPLE: u32 = 1 << 22;
    pub const VARIANT: u32 = 1 << 23;
    pub const NESTED: u32 = 1 << 24;
    pub const GEO: u32 = 1 << 25;
    pub const ALL: u32 = u32::MAX;
}

/// Quoted enum labels the generator draws from, including boundary strings.
const ENUM_LABELS: &[&str] = &[
    "'-1'", "'0'", "'1'", "'10'", "'1000'", "'is'", "'was'", "'are'", "'be'", "'have'", "'had'",
    "'were'", "'can'", "'said'", "'use'", "','", "'😀'", "'😀😀😀😀'", "'名字'", "'兄弟姐妹'",
    "''", "'\\n'", "x'c328'", "x'e28228'", "x'ff'", "b'101'", "b'100'", "b'10001'", "' '", "'c0'",
    "'c1'", "'11'",
];

const TIMEZONES: &[&str] = &[
    "UTC",
    "Africa/Cairo",
    "America/New_York",
    "America/Sao_Paulo",
    "Asia/Kolkata",
    "Asia/Tokyo",
    "Australia/Sydney",
    "Europe/Lisbon",
    "Europe/Moscow",
    "Pacific/Auckland",
];

#[derive(Clone, Copy)]
enum Composite {
    NonNullable,
    Nullable,
    Array,
    Map,
    Tuple,
    Variant,
    Nested,
    Geo,
}

#[derive(Clone, Copy)]
enum Bottom {
    Int,
    Float,
    Date,
    DateTime,
    String,
    Decimal,
    Bool,
    Enum,
    Uuid,
    IPv4,
    IPv6,
    Json,
    Dynamic,
}

/// Produces random well-formed types under a capability mask and depth/width
/// budgets. Every returned tree is freshly owned.
pub struct TypeGenerator {
    max_depth: u32,
    max_width: u32,
    fuzz_floating_points: bool,
    depth: u32,
    width: u32,
}

impl TypeGenerator {
    pub fn new(max_depth: u32, max_width: u32, fuzz_floating_points: bool) -> TypeGenerator {
        TypeGenerator {
            max_depth,
            max_width,
            fuzz_floating_points,
            depth: 0,
            width: 0,
        }
    }

    /// A random type whose tuple/nested field names are drawn from
    /// `col_counter`.
    pub fn random_type(
        &mut self,
        rg: &mut RandomGenerator,
        allowed: u32,
        col_counter: &mut u32,
    ) -> SqlType {
        let non_nullable = 50;
        let nullable = 30 * u32::from(allowed & mask::NULLABLE != 0);
        let array = 10 * u32::from(allowed & mask::ARRAY != 0 && self.depth < self.max_depth);
        let map = 10
            * u32::from(
                allowed & mask::MAP != 0
                    && self.depth < self.max_depth
                    && self.width < self.max_width,
            );
        let tuple = 10 * u32::from(allowed & mask::TUPLE != 0 && self.depth < self.max_depth);
        let variant = 10 * u32::from(allowed & mask::VARIANT != 0 && self.depth < self.max_depth);
        let nested = 10
            * u32::from(
                allowed & mask::NESTED != 0
                    && self.depth < self.max_depth
                    && self.width < self.max_width,
            );
        let geo = 10 * u32::from(allowed & mask::GEO != 0);

        match rg.weighted(&[
            (non_nullable, Composite::NonNullable),
            (nullable, Composite::Nullable),
            (array, Composite::Array),
            (map, Composite::Map),
            (tuple, Composite::Tuple),
            (variant, Composite::Variant),
            (nested, Composite::Nested),
            (geo, Composite::Geo),
        ]) {
            Composite::NonNullable => {
                let lcard = allowed & mask::LOW_CARDINALITY != 0 && rg.next_medium_number() < 18;
                let inner = self.bottom_type(rg, allowed, lcard);
                if lcard {
                    SqlType::LowCardinality(Box::new(inner))
                } else {
                    inner
                }
            }
            Composite::Nullable => {
                let lcard = allowed & mask::LOW_CARDINALITY != 0 && rg.next_medium_number() < 18;
                let inner = self.bottom_type(rg, allowed & !(mask::DYNAMIC | mask::JSON), lcard);
                let nullable = SqlType::Nullable(Box::new(inner));
                if lcard {
                    SqlType::LowCardinality(Box::new(nullable))
                } else {
                    nullable
                }
            }
            Composite::Array => {
                let nallowed = allowed
                    & !mask::NESTED
                    & if allowed & mask::NULLABLE_INSIDE_ARRAY != 0 {
                        mask::ALL
                    } else {
                        !mask::NULLABLE
                    };
                self.array_type(rg, nallowed, col_counter)
            }
            Composite::Map => {
                self.depth += 1;
                let key =
                    self.random_type(rg, allowed & !(mask::NULLABLE | mask::NESTED), col_counter);
                self.width += 1;
                let value = self.random_type(rg, allowed & !mask::NESTED, col_counter);
                self.depth -= 1;
                self.width -= 1;
                SqlType::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Composite::Tuple => {
                let with_names = rg.next_bool();
                let ncols = if self.width >= self.max_width {
                    0
                } else {
                    rg.next_medium_number() % 6.min(self.max_width - self.width)
                };
                let mut fields = Vec::new();
                self.depth += 1;
                for _ in 0..ncols {
                    let name = with_names.then(|| {
                        let n = *col_counter;
                        *col_counter += 1;
                        n
                    });
                    let ftype = self.random_type(rg, allowed & !mask::NESTED, col_counter);
                    fields.push(TupleField { name, ftype });
                }
                self.depth -= 1;
                SqlType::Tuple(fields)
            }
            Composite::Variant => {
                let ncols = if self.width >= self.max_width {
                    0
                } else {
                    rg.next_medium_number() % 6.min(self.max_width - self.width)
                };
                let mut subs = Vec::new();
                self.depth += 1;
                for _ in 0..ncols {
                    subs.push(self.random_type(
                        rg,
                        allowed
                            & !(mask::NULLABLE | mask::NESTED | mask::VARIANT | mask::DYNAMIC),
                        col_counter,
                    ));
                }
                self.depth -= 1;
                SqlType::Variant(subs)
            }
            Composite::Nested => {
                let ncols = rg.next_medium_number() % 5.min(self.max_width - self.width) + 1;
                let mut fields = Vec::new();
                self.depth += 1;
                for _ in 0..ncols {
                    let name = *col_counter;
                    *col_counter += 1;
                    let ftype = self.random_type(rg, allowed & !mask::NESTED, col_counter);
                    fields.push(NestedField { name, ftype });
                }
                self.depth -= 1;
                SqlType::Nested(fields)
            }
            Composite::Geo => SqlType::Geo(*rg.pick(&GeoKind::ALL)),
        }
    }

    /// A random type with fresh field numbering.
    pub fn simple_type(&mut self, rg: &mut RandomGenerator, allowed: u32) -> SqlType {
        let mut col_counter = 0;
        self.random_type(rg, allowed, &mut col_counter)
    }

    pub fn array_type(
        &mut self,
        rg: &mut RandomGenerator,
        allowed: u32,
        col_counter: &mut u32,
    ) -> SqlType {
        self.depth += 1;
        let inner = self.random_type(rg, allowed, col_counter);
        self.depth -= 1;
        SqlType::Array(Box::new(inner))
    }

    fn bottom_type(&mut self, rg: &mut RandomGenerator, allowed: u32, low_card: bool) -> SqlType {
        let not_lc = !low_card;
        let int = 40;
        let float =
            10 * u32::from(allowed & mask::FLOAT != 0 && self.fuzz_floating_points);
        let date = 15 * u32::from(allowed & mask::DATE != 0);
        let datetime = 15 * u32::from(allowed & mask::DATETIME != 0);
        let string = 30 * u32::from(allowed & mask::STRING != 0);
        let decimal = 20 * u32::from(not_lc && allowed & mask::DECIMAL != 0);
        let boolean = 20 * u32::from(not_lc && allowed & mask::BOOL != 0);
        let enum_t = 20 * u32::from(not_lc && allowed & mask::ENUM != 0);
        let uuid = 10 * u32::from(not_lc && allowed & mask::UUID != 0);
        let ipv4 = 5 * u32::from(not_lc && allowed & mask::IPV4 != 0);
        let ipv6 = 5 * u32::from(not_lc && allowed & mask::IPV6 != 0);
        let json = 20 * u32::from(not_lc && allowed & mask::JSON != 0);
        let dynamic = 30 * u32::from(not_lc && allowed & mask::DYNAMIC != 0);

        match rg.weighted(&[
            (int, Bottom::Int),
            (float, Bottom::Float),
            (date, Bottom::Date),
            (datetime, Bottom::DateTime),
            (string, Bottom::String),
            (decimal, Bottom::Decimal),
            (boolean, Bottom::Bool),
            (enum_t, Bottom::Enum),
            (uuid, Bottom::Uuid),
            (ipv4, Bottom::IPv4),
            (ipv6, Bottom::IPv6),
            (json, Bottom::Json),
            (dynamic, Bottom::Dynamic),
        ]) {
            Bottom::Int => self.int_type(rg, allowed),
            Bottom::Float => SqlType::Float {
                bits: if rg.next_bool() { 32 } else { 64 },
            },
            Bottom::Date => SqlType::Date {
                extended: allowed & mask::DATE32 != 0 && rg.next_bool(),
            },
            Bottom::DateTime => {
                // DateTime64 inside LowCardinality is rejected by the engine.
                let a = if low_card {
                    allowed & !mask::DATETIME64
                } else {
                    allowed
                };
                self.datetime_type(rg, a)
            }
            Bottom::String => SqlType::String {
                fixed_len: if rg.next_bool() {
                    None
                } else {
                    Some(if rg.next_bool() {
                        rg.next_small_number()
                    } else {
                        (rg.next_u32() % 100).max(1)
                    })
                },
            },
            Bottom::Decimal => {
                let precision = rg.next_bool().then(|| rg.next_u32() % 10 + 1);
                let scale = match precision {
                    Some(p) if rg.next_bool() => Some(rg.next_u32() % (p + 1)),
                    _ => None,
                };
                SqlType::Decimal { precision, scale }
            }
            Bottom::Bool => SqlType::Bool,
            Bottom::Enum => self.enum_type(rg),
            Bottom::Uuid => SqlType::Uuid,
            Bottom::IPv4 => SqlType::IPv4,
            Bottom::IPv6 => SqlType::IPv6,
            Bottom::Json => self.json_type(rg),
            Bottom::Dynamic => SqlType::Dynamic {
                max_types: rg.next_bool().then(|| {
                    if rg.next_bool() {
                        rg.next_small_number()
                    } else {
                        rg.next_u32() % 100 + 1
                    }
                }),
            },
        }
    }

    fn int_type(&mut self, rg: &mut RandomGenerator, allowed: u32) -> SqlType {
        let mut choices: Vec<(u32, bool)> = Vec::new();
        if allowed & mask::UNSIGNED_INT != 0 {
            if allowed & mask::INT8 != 0 {
                choices.push((8, false));
            }
            choices.extend([(16, false), (32, false), (64, false)]);
            if allowed & mask::HUGE_INT != 0 {
                choices.extend([(128, false), (256, false)]);
            }
        }
        if allowed & mask::INT8 != 0 {
            choices.push((8, true));
        }
        choices.extend([(16, true), (32, true), (64, true)]);
        if allowed & mask::HUGE_INT != 0 {
            choices.extend([(128, true), (256, true)]);
        }
        let (bits, signed) = *rg.pick(&choices);
        SqlType::Int { bits, signed }
    }

    fn datetime_type(&mut self, rg: &mut RandomGenerator, allowed: u32) -> SqlType {
        let extended = allowed & mask::DATETIME64 != 0 && rg.next_bool();
        let precision = (extended && rg.next_small_number() < 5).then(|| rg.next_small_number() - 1);
        let timezone =
            (rg.next_small_number() < 5).then(|| rg.pick(TIMEZONES).to_string());
        SqlType::DateTime {
            extended,
            precision,
            timezone,
        }
    }

    fn enum_type(&mut self, rg: &mut RandomGenerator) -> SqlType {
        let bits16 = rg.next_bool();
        let nvalues = (rg.next_large_number() as usize % ENUM_LABELS.len()) + 1;
        let mut labels: Vec<&str> = ENUM_LABELS.to_vec();
        rg.shuffle(&mut labels);
        let mut numbers = BTreeSet::new();
        while numbers.len() < nvalues {
            numbers.insert(if bits16 {
                i32::from(rg.next_i16())
            } else {
                i32::from(rg.next_i8())
            });
        }
        let values = labels
            .into_iter()
            .take(nvalues)
            .zip(numbers)
            .map(|(label, number)| EnumValue {
                label: label.to_string(),
                number,
            })
            .collect();
        SqlType::Enum {
            bits: if bits16 { 16 } else { 8 },
            values,
        }
    }

    fn json_type(&mut self, rg: &mut RandomGenerator) -> SqlType {
        let nclauses = rg.next_medium_number() % 7;
        let mut spec = String::new();
        if nclauses > 0 {
            spec.push('(');
        }
        for i in 0..nclauses {
            if i != 0 {
                spec.push_str(", ");
            }
            let noption = rg.next_small_number();
            if noption < 4 {
                let max_dpaths = if rg.next_bool() {
                    rg.next_small_number() % 5
                } else {
                    rg.next_u32() % 1025
                };
                spec.push_str(&format!("max_dynamic_paths={max_dpaths}"));
            } else if self.depth >= self.max_depth || noption < 8 {
                let max_dtypes = if rg.next_bool() {
                    rg.next_small_number() % 5
                } else {
                    rg.next_u32() % 33
                };
                spec.push_str(&format!("max_dynamic_types={max_dtypes}"));
            } else {
                let nsegments = rg.next_medium_number() % 4 + 1;
                for j in 0..nsegments {
                    if j != 0 {
                        spec.push('.');
                    }
                    spec.push('`');
                    spec.push_str(rg.next_json_col());
                    spec.push('`');
                }
                spec.push(' ');
                self.depth += 1;
                let mut col_counter = 0;
                let sub = self.random_type(
                    rg,
                    mask::ALL & !(mask::NESTED | mask::ENUM),
                    &mut col_counter,
                );
                self.depth -= 1;
                sub.render(false, &mut spec);
            }
        }
        if nclauses > 0 {
            spec.push(')');
        }
        SqlType::Json { spec }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(t: &SqlType, inside_nullable: bool, inside_composite: bool, depth: u32) {
        assert!(depth < 64, "runaway type recursion");
        match t {
            SqlType::Nullable(inner) => {
                assert!(!inside_nullable, "Nullable directly under Nullable");
                assert!(
                    !matches!(**inner, SqlType::Dynamic { .. } | SqlType::Json { .. }),
                    "Dynamic/JSON inside Nullable"
                );
                check_invariants(inner, true, inside_composite, depth + 1);
            }
            SqlType::LowCardinality(inner) => {
                let unwrapped = inner.unwrapped();
                assert!(unwrapped.is_bottom(), "LowCardinality over composite");
                check_invariants(inner, inside_nullable, inside_composite, depth + 1);
            }
            SqlType::Array(inner) => check_invariants(inner, false, true, depth + 1),
            SqlType::Map { key, value } => {
                assert!(!matches!(**key, SqlType::Nullable(_)), "nullable map key");
                check_invariants(key, false, true, depth + 1);
                check_invariants(value, false, true, depth + 1);
            }
            SqlType::Tuple(fields) => {
                for f in fields {
                    check_invariants(&f.ftype, false, true, depth + 1);
                }
            }
            SqlType::Variant(subs) => {
                for s in subs {
                    assert!(
                        !matches!(
                            s,
                            SqlType::Nullable(_) | SqlType::Variant(_) | SqlType::Dynamic { .. }
                        ),
                        "invalid variant child"
                    );
                    check_invariants(s, false, true, depth + 1);
                }
            }
            SqlType::Nested(fields) => {
                assert!(!inside_composite, "Nested inside a composite");
                for f in fields {
                    check_invariants(&f.ftype, false, true, depth + 1);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_generated_types_satisfy_invariants() {
        let mut rg = RandomGenerator::new(11);
        let mut tg = TypeGenerator::new(3, 5, true);
        for _ in 0..2000 {
            let t = tg.simple_type(&mut rg, mask::ALL);
            check_invariants(&t, false, false, 0);
        }
    }

    #[test]
    fn test_mask_restricts_classes() {
        let mut rg = RandomGenerator::new(5);
        let mut tg = TypeGenerator::new(3, 5, true);
        for _ in 0..500 {
            let t = tg.simple_type(&mut rg, 0);
            assert!(
                matches!(t, SqlType::Int { .. }),
                "empty mask must fall back to plain integers, got {t}"
            );
        }
    }

    #[test]
    fn test_no_int8_or_huge_without_bits() {
        let mut rg = RandomGenerator::new(6);
        let mut tg = TypeGenerator::new(3, 5, true);
        for _ in 0..500 {
            if let SqlType::Int { bits, .. } = tg.simple_type(&mut rg, mask::UNSIGNED_INT) {
                assert!((16..=64).contains(&bits), "unexpected width {bits}");
            }
        }
    }

    #[test]
    fn test_rendering_is_reparseable_shape() {
        let mut rg = RandomGenerator::new(8);
        let mut tg = TypeGenerator::new(3, 5, true);
        for _ in 0..500 {
            let t = tg.simple_type(&mut rg, mask::ALL);
            let rendered = t.to_string();
            assert!(!rendered.is_empty());
            assert_eq!(
                rendered.matches('(').count(),
                rendered.matches(')').count(),
                "unbalanced parens in {rendered}"
            );
        }
    }
}

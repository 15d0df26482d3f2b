use crate::random::RandomGenerator;
use crate::typegen::{mask, TypeGenerator};
use crate::types::{GeoKind, SqlType};

/// Produces random SQL literal text for any [`SqlType`].
///
/// Recursion through composite values shares the depth budget with the type
/// generator; once exhausted, the fallback literal `1` is emitted.
pub struct ValueGenerator {
    max_depth: u32,
    max_width: u32,
    max_string_length: u32,
    fuzz_floating_points: bool,
    depth: u32,
}

impl ValueGenerator {
    pub fn new(max_depth: u32, max_width: u32, fuzz_floating_points: bool) -> ValueGenerator {
        ValueGenerator {
            max_depth,
            max_width,
            max_string_length: 10000,
            fuzz_floating_points,
            depth: 0,
        }
    }

    /// Caps generated string literal lengths.
    pub fn with_max_string_length(mut self, max_string_length: u32) -> ValueGenerator {
        self.max_string_length = max_string_length.max(1);
        self
    }

    /// A literal for `tp`, with a `::<type>` cast suffix about two thirds of
    /// the time to pin the interpretation server-side.
    pub fn any_value(&mut self, rg: &mut RandomGenerator, tp: &SqlType) -> String {
        let mut out = String::new();
        self.value_internal(rg, &mut out, tp);
        if rg.next_small_number() < 7 {
            out.push_str("::");
            tp.render(false, &mut out);
        }
        out
    }

    /// A literal without the cast suffix.
    pub fn plain_value(&mut self, rg: &mut RandomGenerator, tp: &SqlType) -> String {
        let mut out = String::new();
        self.value_internal(rg, &mut out, tp);
        out
    }

    fn value_internal(&mut self, rg: &mut RandomGenerator, out: &mut String, tp: &SqlType) {
        let ndefault = rg.next_medium_number();
        if ndefault < 5 {
            out.push_str("NULL");
            return;
        }
        if ndefault == 5 {
            out.push_str("DEFAULT");
            return;
        }
        match tp {
            SqlType::Bool
            | SqlType::Int { .. }
            | SqlType::Float { .. }
            | SqlType::Date { .. }
            | SqlType::DateTime { .. }
            | SqlType::Decimal { .. }
            | SqlType::String { .. }
            | SqlType::Enum { .. }
            | SqlType::Uuid
            | SqlType::IPv4
            | SqlType::IPv6 => self.bottom_value(rg, out, tp),
            SqlType::LowCardinality(inner) | SqlType::Nullable(inner) => {
                self.value_internal(rg, out, inner)
            }
            SqlType::Json { .. } => {
                let jdepth = rg.uniform(1, self.max_depth.max(1));
                let jwidth = rg.uniform(1, self.max_width.max(1));
                out.push('\'');
                self.json_document(rg, jdepth, jwidth, out);
                out.push('\'');
            }
            SqlType::Dynamic { .. } => {
                let mut tg =
                    TypeGenerator::new(self.max_depth, self.max_width, self.fuzz_floating_points);
                let next = tg.simple_type(rg, mask::NULLABLE | mask::JSON);
                self.value_internal(rg, out, &next);
            }
            SqlType::Geo(kind) => geo_value(rg, out, *kind),
            _ if self.depth == self.max_depth => out.push('1'),
            SqlType::Map { key, value } => {
                self.depth += 1;
                let limit = rg.next_large_number() % 100;
                out.push_str("map(");
                for i in 0..limit {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    self.value_internal(rg, out, key);
                    out.push(',');
                    self.value_internal(rg, out, value);
                }
                out.push(')');
                self.depth -= 1;
            }
            SqlType::Array(inner) => {
                self.depth += 1;
                let limit = rg.next_large_number() % 100;
                out.push('[');
                for i in 0..limit {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    self.value_internal(rg, out, inner);
                }
                out.push(']');
                self.depth -= 1;
            }
            SqlType::Tuple(fields) => {
                self.depth += 1;
                out.push('(');
                for (i, field) in fields.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    self.value_internal(rg, out, &field.ftype);
                }
                out.push(')');
                self.depth -= 1;
            }
            SqlType::Variant(subs) => {
                self.depth += 1;
                if subs.is_empty() {
                    out.push_str("NULL");
                } else {
                    let pick = subs[rg.uniform(0, subs.len() as u32 - 1) as usize].clone();
                    self.value_internal(rg, out, &pick);
                }
                self.depth -= 1;
            }
            // Nested columns are inserted through their expanded subcolumns,
            // never as a single literal.
            SqlType::Nested(_) => unreachable!("nested type has no literal form"),
        }
    }

    fn bottom_value(&mut self, rg: &mut RandomGenerator, out: &mut String, tp: &SqlType) {
        match tp {
            SqlType::Int { bits, signed } => {
                if *signed {
                    match bits {
                        8 => out.push_str(&rg.next_i8().to_string()),
                        16 => out.push_str(&rg.next_i16().to_string()),
                        32 => out.push_str(&rg.next_i32().to_string()),
                        64 => out.push_str(&rg.next_i64().to_string()),
                        _ => out.push_str(&rg.next_i128().to_string()),
                    }
                } else {
                    match bits {
                        8 => out.push_str(&rg.next_u8().to_string()),
                        16 => out.push_str(&rg.next_u16().to_string()),
                        32 => out.push_str(&rg.next_u32().to_string()),
                        64 => out.push_str(&rg.next_u64().to_string()),
                        _ => out.push_str(&rg.next_u128().to_string()),
                    }
                }
            }
            SqlType::Float { .. } => float_literal(rg, out),
            SqlType::Date { extended } => {
                out.push('\'');
                out.push_str(&if *extended {
                    rg.next_date32()
                } else {
                    rg.next_date()
                });
                out.push('\'');
            }
            SqlType::DateTime {
                extended,
                precision,
                ..
            } => {
                out.push('\'');
                out.push_str(&if *extended {
                    rg.next_datetime64(precision.unwrap_or(3))
                } else {
                    rg.next_datetime()
                });
                out.push('\'');
            }
            SqlType::Decimal { precision, scale } => {
                let right = scale.unwrap_or(0);
                let left = precision.unwrap_or(10) - right;
                decimal_literal(rg, out, left, right);
            }
            SqlType::String { fixed_len } => {
                let limit =
                    fixed_len.unwrap_or_else(|| rg.next_u32() % self.max_string_length + 1);
                out.push_str(&rg.next_string('\'', true, limit));
            }
            SqlType::Bool => out.push_str(if rg.next_bool() { "TRUE" } else { "FALSE" }),
            SqlType::Enum { values, .. } => {
                out.push_str(&rg.pick(values).label.clone());
            }
            SqlType::Uuid => out.push_str(&format!("'{}'", rg.next_uuid())),
            SqlType::IPv4 => out.push_str(&format!("'{}'", rg.next_ipv4())),
            SqlType::IPv6 => out.push_str(&format!("'{}'", rg.next_ipv6())),
            _ => unreachable!("not a bottom type: {tp}"),
        }
    }

    fn json_document(&mut self, rg: &mut RandomGenerator, jdepth: u32, jwidth: u32, out: &mut String) {
        out.push('{');
        if jdepth > 0 && jwidth > 0 && rg.next_small_number() < 9 {
            let nchildren = rg.uniform(1, jwidth);
            for i in 0..nchildren {
                if i != 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(rg.next_json_col());
                out.push_str("\":");
                match rg.uniform(1, 3) {
                    1 => self.json_document(rg, jdepth - 1, jwidth, out),
                    2 => self.json_array(rg, jdepth - 1, jwidth, out),
                    _ => json_element(rg, out),
                }
            }
        }
        out.push('}');
    }

    fn json_array(&mut self, rg: &mut RandomGenerator, jdepth: u32, jwidth: u32, out: &mut String) {
        let nelems = if jwidth > 0 { rg.uniform(0, jwidth) } else { 0 };
        out.push('[');
        for j in 0..nelems {
            if j != 0 {
                out.push(',');
            }
            if jdepth > 0 {
                match rg.uniform(1, 3) {
                    1 => self.json_document(rg, jdepth - 1, jwidth, out),
                    2 => self.json_array(rg, jdepth - 1, jwidth, out),
                    _ => json_element(rg, out),
                }
            } else {
                json_element(rg, out);
            }
        }
        out.push(']');
    }
}

/// Floating-point literal generator. Specials (`±nan`, `±inf`, `±0.0`) carry
/// nontrivial probability alongside small/large integers and plain doubles.
fn float_literal(rg: &mut RandomGenerator, out: &mut String) {
    let next_option = rg.next_large_number();
    if next_option < 25 {
        if next_option < 17 {
            out.push(if next_option < 9 { '+' } else { '-' });
        }
        out.push_str("nan");
    } else if next_option < 49 {
        if next_option < 41 {
            out.push(if next_option < 33 { '+' } else { '-' });
        }
        out.push_str("inf");
    } else if next_option < 73 {
        if next_option < 65 {
            out.push(if next_option < 57 { '+' } else { '-' });
        }
        out.push_str("0.0");
    } else if next_option < 373 {
        out.push_str(&rg.next_i32().to_string());
    } else if next_option < 673 {
        out.push_str(&rg.next_i64().to_string());
    } else {
        out.push_str(&rg.next_double().to_string());
    }
}

/// Decimal literal with up to `left` integral and `right` fractional digits.
/// A zero `left` budget pins the integral part to `0`.
fn decimal_literal(rg: &mut RandomGenerator, out: &mut String, left: u32, right: u32) {
    if rg.next_bool() {
        out.push('-');
    }
    if left > 0 {
        let nlen = rg.uniform(1, left);
        out.push(rg.next_digit().max('1'));
        for _ in 1..nlen {
            out.push(rg.next_digit());
        }
    } else {
        out.push('0');
    }
    out.push('.');
    if right > 0 {
        let nlen = rg.uniform(1, right);
        for _ in 0..nlen {
            out.push(rg.next_digit());
        }
    } else {
        out.push('0');
    }
}

fn json_element(rg: &mut RandomGenerator, out: &mut String) {
    match rg.uniform(1, 16) {
        1 => out.push_str("false"),
        2 => out.push_str("true"),
        3 => out.push_str("null"),
        4 => out.push_str(&rg.next_i64().to_string()),
        5 => out.push_str(&rg.next_u64().to_string()),
        6 | 7 => out.push_str(&(rg.uniform(0, 2000) as i64 - 1000).to_string()),
        8 => {
            out.push('"');
            out.push_str(&rg.next_date());
            out.push('"');
        }
        9 => {
            let left = rg.uniform(0, 30);
            let right = rg.uniform(0, 30);
            decimal_literal(rg, out, left, right);
        }
        10 | 11 | 12 => {
            let limit = rg.next_u32() % 10000 + 1;
            out.push_str(&rg.next_string('"', false, limit));
        }
        13 => {
            out.push('"');
            out.push_str(&rg.next_uuid().to_string());
            out.push('"');
        }
        14 => {
            out.push('"');
            out.push_str(&rg.next_ipv4().to_string());
            out.push('"');
        }
        15 => {
            out.push('"');
            out.push_str(&rg.next_ipv6().to_string());
            out.push('"');
        }
        _ => out.push_str(&rg.next_double().to_string()),
    }
}

/// Geo values are structured nested literals by kind.
fn geo_value(rg: &mut RandomGenerator, out: &mut String, kind: GeoKind) {
    let limit = rg.next_large_number() % 10;
    match kind {
        GeoKind::Point => point_value(rg, out),
        GeoKind::Ring | GeoKind::LineString => {
            out.push('[');
            for i in 0..limit {
                if i != 0 {
                    out.push(',');
                }
                point_value(rg, out);
            }
            out.push(']');
        }
        GeoKind::MultiLineString | GeoKind::Polygon => {
            out.push('[');
            for i in 0..limit {
                if i != 0 {
                    out.push(',');
                }
                let npoints = rg.next_large_number() % 10;
                out.push('[');
                for j in 0..npoints {
                    if j != 0 {
                        out.push(',');
                    }
                    point_value(rg, out);
                }
                out.push(']');
            }
            out.push(']');
        }
        GeoKind::MultiPolygon => {
            out.push('[');
            for i in 0..limit {
                if i != 0 {
                    out.push(',');
                }
                let npolygons = rg.next_large_number() % 10;
                out.push('[');
                for j in 0..npolygons {
                    if j != 0 {
                        out.push(',');
                    }
                    let npoints = rg.next_large_number() % 10;
                    out.push('[');
                    for k in 0..npoints {
                        if k != 0 {
                            out.push(',');
                        }
                        point_value(rg, out);
                    }
                    out.push(']');
                }
                out.push(']');
            }
            out.push(']');
        }
    }
}

fn point_value(rg: &mut RandomGenerator, out: &mut String) {
    out.push('(');
    float_literal(rg, out);
    out.push(',');
    float_literal(rg, out);
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegen::{mask, TypeGenerator};

    #[test]
    fn test_float_specials_all_reachable() {
        let mut rg = RandomGenerator::new(2);
        let mut seen_nan = false;
        let mut seen_inf = false;
        let mut seen_neg_zero = false;
        for _ in 0..5000 {
            let mut s = String::new();
            float_literal(&mut rg, &mut s);
            seen_nan |= s.contains("nan");
            seen_inf |= s.contains("inf");
            seen_neg_zero |= s == "-0.0";
        }
        assert!(seen_nan && seen_inf && seen_neg_zero);
    }

    #[test]
    fn test_decimal_zero_left_budget() {
        let mut rg = RandomGenerator::new(4);
        for _ in 0..100 {
            let mut s = String::new();
            decimal_literal(&mut rg, &mut s, 0, 3);
            let unsigned = s.trim_start_matches('-');
            assert!(unsigned.starts_with("0."), "{s}");
        }
    }

    #[test]
    fn test_values_for_random_types_are_nonempty() {
        let mut rg = RandomGenerator::new(10);
        let mut tg = TypeGenerator::new(3, 5, true);
        let mut vg = ValueGenerator::new(3, 5, true);
        for _ in 0..500 {
            let t = tg.simple_type(&mut rg, mask::ALL & !mask::NESTED);
            let v = vg.any_value(&mut rg, &t);
            assert!(!v.is_empty());
        }
    }

    #[test]
    fn test_bool_values() {
        let mut rg = RandomGenerator::new(14);
        let mut vg = ValueGenerator::new(3, 5, true);
        for _ in 0..50 {
            let v = vg.plain_value(&mut rg, &SqlType::Bool);
            assert!(
                v == "TRUE" || v == "FALSE" || v == "NULL" || v == "DEFAULT",
                "{v}"
            );
        }
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Field names used when synthesizing JSON documents and JSON subpath
/// declarations.
const JSON_FIELD_NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "x", "y", "z", "id", "key", "name", "value", "data", "item", "path",
    "nested",
];

/// Multibyte runes mixed into generated strings.
const WIDE_RUNES: &[&str] = &["😀", "名", "字", "兄", "弟", "á", "Ω", "ß"];

/// Single source of randomness for the whole generator.
///
/// Every probabilistic decision flows through this wrapper so a fixed seed
/// yields a fixed statement stream. `StdRng` is used instead of `SmallRng`
/// because its output does not depend on the host word size.
pub struct RandomGenerator {
    rng: StdRng,
}

impl RandomGenerator {
    pub fn new(seed: u64) -> RandomGenerator {
        RandomGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_bool(&mut self) -> bool {
        self.rng.gen_range(0..2) == 1
    }

    pub fn next_digit(&mut self) -> char {
        (b'0' + self.rng.gen_range(0..10u8)) as char
    }

    /// Uniform in `1..=10`.
    pub fn next_small_number(&mut self) -> u32 {
        self.rng.gen_range(1..=10)
    }

    /// Uniform in `1..=100`.
    pub fn next_medium_number(&mut self) -> u32 {
        self.rng.gen_range(1..=100)
    }

    /// Uniform in `1..=1000`.
    pub fn next_large_number(&mut self) -> u32 {
        self.rng.gen_range(1..=1000)
    }

    /// Uniform in `low..=high`.
    pub fn uniform(&mut self, low: u32, high: u32) -> u32 {
        self.rng.gen_range(low..=high)
    }

    pub fn next_u8(&mut self) -> u8 {
        self.rng.gen()
    }

    pub fn next_u16(&mut self) -> u16 {
        self.rng.gen()
    }

    pub fn next_u32(&mut self) -> u32 {
        self.rng.gen()
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }

    pub fn next_u128(&mut self) -> u128 {
        self.rng.gen()
    }

    pub fn next_i8(&mut self) -> i8 {
        self.rng.gen()
    }

    pub fn next_i16(&mut self) -> i16 {
        self.rng.gen()
    }

    pub fn next_i32(&mut self) -> i32 {
        self.rng.gen()
    }

    pub fn next_i64(&mut self) -> i64 {
        self.rng.gen()
    }

    pub fn next_i128(&mut self) -> i128 {
        self.rng.gen()
    }

    pub fn next_double(&mut self) -> f64 {
        self.rng.gen_range(-1.0e6..1.0e6)
    }

    /// Weighted choice over `(weight, value)` rows. Rows with weight zero are
    /// never selected; the total weight must be positive.
    pub fn weighted<T: Copy>(&mut self, options: &[(u32, T)]) -> T {
        let idx = self.weighted_index(options.iter().map(|(w, _)| *w));
        options[idx].1
    }

    /// Like [`weighted`](Self::weighted), returning the selected index.
    pub fn weighted_index<I>(&mut self, weights: I) -> usize
    where
        I: IntoIterator<Item = u32>,
    {
        let weights: Vec<u32> = weights.into_iter().collect();
        let total: u32 = weights.iter().sum();
        assert!(total > 0, "weighted choice over an empty probability space");
        let mut pick = self.rng.gen_range(0..total);
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                return i;
            }
            pick -= w;
        }
        unreachable!()
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "picking from an empty slice");
        &items[self.rng.gen_range(0..items.len())]
    }

    pub fn pick_from_set<'a, T: Ord>(&mut self, items: &'a BTreeSet<T>) -> &'a T {
        assert!(!items.is_empty(), "picking from an empty set");
        let nth = self.rng.gen_range(0..items.len());
        items.iter().nth(nth).unwrap()
    }

    pub fn pick_key<'a, K: Ord, V>(&mut self, items: &'a BTreeMap<K, V>) -> &'a K {
        assert!(!items.is_empty(), "picking from an empty map");
        let nth = self.rng.gen_range(0..items.len());
        items.keys().nth(nth).unwrap()
    }

    pub fn pick_value<'a, K: Ord, V>(&mut self, items: &'a BTreeMap<K, V>) -> &'a V {
        assert!(!items.is_empty(), "picking from an empty map");
        let nth = self.rng.gen_range(0..items.len());
        items.values().nth(nth).unwrap()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// `YYYY-MM-DD` within the engine's `Date` range.
    pub fn next_date(&mut self) -> String {
        self.date_in_years(1970, 2148)
    }

    /// `YYYY-MM-DD` within the extended `Date32` range.
    pub fn next_date32(&mut self) -> String {
        self.date_in_years(1900, 2299)
    }

    fn date_in_years(&mut self, min_year: i32, max_year: i32) -> String {
        let year = self.rng.gen_range(min_year..=max_year);
        let month = self.rng.gen_range(1..=12u32);
        let day = self.rng.gen_range(1..=days_in_month(year, month));
        format!("{:04}-{:02}-{:02}", year, month, day)
    }

    /// `YYYY-MM-DD hh:mm:ss` within the engine's `DateTime` range.
    pub fn next_datetime(&mut self) -> String {
        let date = self.date_in_years(1970, 2105);
        format!(
            "{} {:02}:{:02}:{:02}",
            date,
            self.rng.gen_range(0..24u32),
            self.rng.gen_range(0..60u32),
            self.rng.gen_range(0..60u32)
        )
    }

    /// `DateTime64` literal, with `precision` subsecond digits when nonzero.
    pub fn next_datetime64(&mut self, precision: u32) -> String {
        let date = self.date_in_years(1900, 2299);
        let mut out = format!(
            "{} {:02}:{:02}:{:02}",
            date,
            self.rng.gen_range(0..24u32),
            self.rng.gen_range(0..60u32),
            self.rng.gen_range(0..60u32)
        );
        if precision > 0 {
            out.push('.');
            for _ in 0..precision {
                out.push(self.next_digit());
            }
        }
        out
    }

    pub fn next_uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    pub fn next_ipv4(&mut self) -> Ipv4Addr {
        Ipv4Addr::from(self.rng.gen::<u32>())
    }

    pub fn next_ipv6(&mut self) -> Ipv6Addr {
        Ipv6Addr::from(self.rng.gen::<u128>())
    }

    /// Quoted string literal of up to `max_len` characters, mixing ASCII,
    /// whitespace, multibyte runes, the empty string and, when `allow_escape`
    /// is set, backslash escapes. The `quote` character is escaped by
    /// doubling the backslash form so the literal always reparses.
    pub fn next_string(&mut self, quote: char, allow_escape: bool, max_len: u32) -> String {
        let mut body = String::new();
        // Zero-length strings are a required boundary value.
        let len = if self.next_medium_number() < 4 {
            0
        } else {
            self.rng.gen_range(1..=max_len.max(1))
        };
        for _ in 0..len {
            let nopt = self.next_large_number();
            if nopt < 601 {
                let c = self.rng.gen_range(b' '..=b'~') as char;
                // Bare quotes and backslashes would unbalance the literal;
                // escapes only enter through the dedicated branch below.
                if c != quote && c != '\\' {
                    body.push(c);
                }
            } else if nopt < 701 {
                body.push(self.next_digit());
            } else if nopt < 801 {
                body.push_str(*self.pick(WIDE_RUNES));
            } else if allow_escape && nopt < 901 {
                body.push_str(*self.pick(&["\\n", "\\t", "\\\\", "\\0"]));
            } else {
                body.push(' ');
            }
        }
        format!("{quote}{body}{quote}")
    }

    pub fn next_json_col(&mut self) -> &'static str {
        *self.pick(JSON_FIELD_NAMES)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let next = NaiveDate::from_ymd_opt(next_y, next_m, 1).unwrap();
    next.signed_duration_since(first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RandomGenerator::new(42);
        let mut b = RandomGenerator::new(42);
        for _ in 0..256 {
            assert_eq!(a.next_u64(), b.next_u64());
            assert_eq!(a.next_small_number(), b.next_small_number());
            assert_eq!(a.next_string('\'', true, 20), b.next_string('\'', true, 20));
        }
    }

    #[test]
    fn test_ranges() {
        let mut rg = RandomGenerator::new(1);
        for _ in 0..1000 {
            assert!((1..=10).contains(&rg.next_small_number()));
            assert!((1..=100).contains(&rg.next_medium_number()));
            assert!((1..=1000).contains(&rg.next_large_number()));
        }
    }

    #[test]
    fn test_weighted_skips_zero_weights() {
        let mut rg = RandomGenerator::new(7);
        for _ in 0..200 {
            let v = rg.weighted(&[(0, "never"), (5, "a"), (0, "never"), (3, "b")]);
            assert!(v == "a" || v == "b");
        }
    }

    #[test]
    fn test_dates_parse() {
        let mut rg = RandomGenerator::new(3);
        for _ in 0..200 {
            let d = rg.next_date();
            assert!(NaiveDate::parse_from_str(&d, "%Y-%m-%d").is_ok(), "{d}");
            let d32 = rg.next_date32();
            assert!(NaiveDate::parse_from_str(&d32, "%Y-%m-%d").is_ok(), "{d32}");
        }
    }

    #[test]
    fn test_string_quotes_balanced() {
        let mut rg = RandomGenerator::new(9);
        for _ in 0..500 {
            let s = rg.next_string('\'', true, 30);
            assert!(s.starts_with('\'') && s.ends_with('\'') && s.chars().count() >= 2);
            let inner: Vec<char> = s.chars().collect();
            assert!(!inner[1..inner.len() - 1].contains(&'\''));
        }
    }
}

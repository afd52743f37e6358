//! `quickcheck::Arbitrary` generators for `Value`, used by the codec round-trip
//! properties in [`crate::codec`]. Kept separate from `mod.rs` since this is
//! test-only plumbing, not part of the value model itself.

use quickcheck::{Arbitrary, Gen};

use super::{DateTime, Members, Value};

/// Printable, non-whitespace characters safe to round-trip through the codec without
/// tripping over `quick_xml`'s leading/trailing text trimming.
const SAFE_CHARS: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L',
    'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4',
    '5', '6', '7', '8', '9', '!', '@', '#', '$', '%', '^', '*', '(', ')', '-', '_', '=', '+', '[',
    ']', '{', '}', ';', ':', ',', '.', '<', '>', '&', '\'', '"', '/', '?', '~',
];

pub(crate) fn safe_string(g: &mut Gen, max_len: usize) -> String {
    let len = usize::arbitrary(g) % (max_len + 1);
    (0..len)
        .map(|_| *g.choose(SAFE_CHARS).expect("SAFE_CHARS is non-empty"))
        .collect()
}

/// A method name: like `safe_string`, but never empty.
pub(crate) fn safe_name(g: &mut Gen) -> String {
    let mut s = safe_string(g, 11);
    if s.is_empty() {
        s.push('m');
    }
    s
}

fn finite_f64(g: &mut Gen) -> f64 {
    let d = f64::arbitrary(g);
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

fn arbitrary_datetime(g: &mut Gen) -> DateTime {
    DateTime::new(
        i32::arbitrary(g).rem_euclid(10_000),
        (u8::arbitrary(g) % 12) + 1,
        (u8::arbitrary(g) % 28) + 1,
        u8::arbitrary(g) % 24,
        u8::arbitrary(g) % 60,
        u8::arbitrary(g) % 60,
        u32::arbitrary(g) % 1_000_000,
    )
}

/// Caps how deep generated `Array`/`Struct` trees nest, so property runs stay fast and
/// terminate.
const MAX_DEPTH: usize = 3;

fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let variant = if depth < MAX_DEPTH {
        u32::arbitrary(g) % 9
    } else {
        u32::arbitrary(g) % 7
    };

    match variant {
        0 => Value::int(i32::arbitrary(g)),
        1 => Value::bool(bool::arbitrary(g)),
        2 => Value::double(finite_f64(g)),
        3 => Value::datetime(arbitrary_datetime(g)),
        4 => Value::string(safe_string(g, 10)),
        5 => Value::bytestring(Vec::<u8>::arbitrary(g)),
        6 => Value::nil(),
        7 => {
            let len = usize::arbitrary(g) % 4;
            Value::array((0..len).map(|_| arbitrary_value(g, depth + 1)).collect())
        }
        _ => {
            let len = usize::arbitrary(g) % 4;
            let mut members = Members::new();
            for _ in 0..len {
                members.insert(safe_name(g), arbitrary_value(g, depth + 1));
            }
            Value::from_members(members)
        }
    }
}

impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_value(g, 0)
    }
}

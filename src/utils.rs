use std::sync::atomic::{AtomicUsize, Ordering};

/// Since the random number generator doesn't have to be cryptographically secure
/// it doesn't make sense to import the entire rand library, so this is just a
/// xorshift pseudo-random function
static RAND_SEED: AtomicUsize = AtomicUsize::new(2100);

/// Xorshift-based random number generator. Impure function
pub(crate) fn random_number() -> usize {
    let mut x = RAND_SEED.fetch_add(21, Ordering::SeqCst);
    #[cfg(target_pointer_width = "64")]
    {
        x ^= x << 21;
        x ^= x >> 35;
        x ^= x << 4;
        x
    }

    #[cfg(target_pointer_width = "32")]
    {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        x
    }
}

/// Returns a string with 32 random characters
pub(crate) fn random_character_string_32() -> String {
    const MAX_CHARS: usize = 32;
    let mut final_string = String::with_capacity(MAX_CHARS);

    while final_string.len() < MAX_CHARS {
        let rand = random_number().to_string();
        for digit in rand.bytes().map(|b| b - b'0') {
            if final_string.len() == MAX_CHARS {
                break;
            }
            final_string.push(u8_to_char(digit));
        }
    }

    final_string
}

/// Document ID for the trailer: the same 16 bytes twice (the file is never
/// updated incrementally, so the "current" ID equals the original one)
pub(crate) fn document_id() -> Vec<u8> {
    let seed = random_character_string_32();
    md5::compute(seed.as_bytes()).0.to_vec()
}

fn u8_to_char(input: u8) -> char {
    (b'A' + input) as char
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn random_strings_are_uppercase_letters() {
        let s = random_character_string_32();
        assert_eq!(s.len(), 32);
        assert!(s.bytes().all(|b| (b'A'..=b'J').contains(&b)));
    }

    #[test]
    fn document_ids_differ() {
        let a = document_id();
        let b = document_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}

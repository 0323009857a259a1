//! Per-object encryption of strings and streams.
//!
//! The object table keys the hook with the object number and generation
//! before the object's value is encoded, so every string and stream in that
//! object is encrypted with the same object key.

use std::fmt;

use lopdf::{Dictionary as LoDictionary, Object, StringFormat};

/// Padding string used to stretch passwords to 32 bytes
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Document-level encryption hook
pub trait ObjectEncryption: fmt::Debug {
    /// Derives the key for the object that is about to be written
    fn set_object_key(&mut self, number: u32, generation: u16);

    /// Encrypts string or stream data with the current object key
    fn encrypt(&self, data: &[u8]) -> Vec<u8>;

    /// The `/Encrypt` dictionary to put into the trailer
    fn encryption_dictionary(&self) -> LoDictionary;
}

/// Key length of the standard security handler
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyLength {
    /// 40 bit RC4, revision 2
    Bits40,
    /// 128 bit RC4, revision 3
    Bits128,
}

impl KeyLength {
    fn bytes(&self) -> usize {
        match self {
            KeyLength::Bits40 => 5,
            KeyLength::Bits128 => 16,
        }
    }

    fn revision(&self) -> i64 {
        match self {
            KeyLength::Bits40 => 2,
            KeyLength::Bits128 => 3,
        }
    }
}

/// Standard password security handler (RC4, revisions 2 and 3)
#[derive(Clone)]
pub struct StandardEncryption {
    key_length: KeyLength,
    permissions: i32,
    /// Document key, derived from the user password
    key: Vec<u8>,
    /// Key of the object currently being written
    object_key: Vec<u8>,
    owner_entry: Vec<u8>,
    user_entry: Vec<u8>,
}

impl fmt::Debug for StandardEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keys stay out of logs
        f.debug_struct("StandardEncryption")
            .field("key_length", &self.key_length)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl StandardEncryption {
    /// `document_id` is the first element of the trailer `/ID` array. If
    /// `owner_password` is empty the user password is used for both.
    pub fn new(
        user_password: &[u8],
        owner_password: &[u8],
        permissions: i32,
        key_length: KeyLength,
        document_id: &[u8],
    ) -> Self {
        let permissions = match key_length {
            KeyLength::Bits40 => permissions | 0xffff_ffc0_u32 as i32,
            KeyLength::Bits128 => permissions | 0xffff_f0c0_u32 as i32,
        } & 0xffff_fffc_u32 as i32;

        let owner_password = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };

        let user_pad = pad_password(user_password);
        let owner_pad = pad_password(owner_password);
        let n = key_length.bytes();

        let owner_entry = compute_owner_entry(&user_pad, &owner_pad, key_length);

        let mut context = md5::Context::new();
        context.consume(user_pad);
        context.consume(&owner_entry);
        context.consume(permissions.to_le_bytes());
        context.consume(document_id);
        let mut digest = context.compute().0;
        if key_length == KeyLength::Bits128 {
            for _ in 0..50 {
                digest = md5::compute(&digest[..n]).0;
            }
        }
        let key = digest[..n].to_vec();

        let user_entry = match key_length {
            KeyLength::Bits40 => Arcfour::new(&key).process(&PASSWORD_PAD),
            KeyLength::Bits128 => {
                let mut context = md5::Context::new();
                context.consume(PASSWORD_PAD);
                context.consume(document_id);
                let mut entry = Arcfour::new(&key).process(&context.compute().0);
                for i in 1..=19u8 {
                    let round_key = key.iter().map(|b| b ^ i).collect::<Vec<_>>();
                    entry = Arcfour::new(&round_key).process(&entry);
                }
                entry.resize(32, 0);
                entry
            }
        };

        Self {
            key_length,
            permissions,
            object_key: key.clone(),
            key,
            owner_entry,
            user_entry,
        }
    }

    pub fn permissions(&self) -> i32 {
        self.permissions
    }

    /// Document key derived from the user password
    pub fn document_key(&self) -> &[u8] {
        &self.key
    }
}

impl ObjectEncryption for StandardEncryption {
    fn set_object_key(&mut self, number: u32, generation: u16) {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&number.to_le_bytes()[..3]);
        key_data.extend_from_slice(&generation.to_le_bytes());
        let hash = md5::compute(&key_data);
        let len = (self.key.len() + 5).min(16);
        self.object_key = hash.0[..len].to_vec();
    }

    fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        Arcfour::new(&self.object_key).process(data)
    }

    fn encryption_dictionary(&self) -> LoDictionary {
        let mut dict = LoDictionary::from_iter(vec![
            ("Filter", Object::Name(b"Standard".to_vec())),
            ("O", Object::String(self.owner_entry.clone(), StringFormat::Hexadecimal)),
            ("U", Object::String(self.user_entry.clone(), StringFormat::Hexadecimal)),
            ("P", Object::Integer(i64::from(self.permissions))),
            ("R", Object::Integer(self.key_length.revision())),
        ]);
        match self.key_length {
            KeyLength::Bits40 => dict.set("V", Object::Integer(1)),
            KeyLength::Bits128 => {
                dict.set("V", Object::Integer(2));
                dict.set("Length", Object::Integer(128));
            }
        }
        dict
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PAD;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PAD[..32 - len]);
    padded
}

fn compute_owner_entry(user_pad: &[u8; 32], owner_pad: &[u8; 32], key_length: KeyLength) -> Vec<u8> {
    let n = key_length.bytes();
    let mut digest = md5::compute(owner_pad).0;
    if key_length == KeyLength::Bits128 {
        for _ in 0..50 {
            digest = md5::compute(digest).0;
        }
    }
    let key = &digest[..n];
    let mut entry = Arcfour::new(key).process(user_pad);
    if key_length == KeyLength::Bits128 {
        for i in 1..=19u8 {
            let round_key = key.iter().map(|b| b ^ i).collect::<Vec<_>>();
            entry = Arcfour::new(&round_key).process(&entry);
        }
    }
    entry
}

/// RC4 stream cipher
struct Arcfour {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arcfour {
    /// `key` must be 1 to 256 bytes long, the keys derived above are 5 to 16
    fn new(key: &[u8]) -> Self {
        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }
        Self { state, i: 0, j: 0 }
    }

    fn process(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|byte| byte ^ self.next_byte()).collect()
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);
        let idx = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[idx as usize]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rc4_known_vector() {
        // "Key" / "Plaintext" from the RC4 test vectors
        let out = Arcfour::new(b"Key").process(b"Plaintext");
        assert_eq!(out, vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn password_padding() {
        assert_eq!(pad_password(b""), PASSWORD_PAD);
        let padded = pad_password(b"abc");
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PASSWORD_PAD[..29]);
    }

    #[test]
    fn object_keys_depend_on_object_number() {
        let mut enc = StandardEncryption::new(b"user", b"owner", -4, KeyLength::Bits128, b"0123456789abcdef");
        enc.set_object_key(1, 0);
        let first = enc.encrypt(b"secret text");
        enc.set_object_key(2, 0);
        let second = enc.encrypt(b"secret text");
        assert_ne!(first, second);

        enc.set_object_key(1, 0);
        // RC4 is symmetric
        assert_eq!(enc.encrypt(&first), b"secret text".to_vec());
    }

    #[test]
    fn encryption_dictionary_entries() {
        let enc = StandardEncryption::new(b"", b"", 0, KeyLength::Bits40, b"id");
        let dict = enc.encryption_dictionary();
        assert_eq!(dict.get(b"R").unwrap(), &Object::Integer(2));
        assert_eq!(dict.get(b"V").unwrap(), &Object::Integer(1));
        assert!(dict.get(b"Length").is_err());
        assert_eq!(enc.document_key().len(), 5);

        let enc = StandardEncryption::new(b"", b"", 0, KeyLength::Bits128, b"id");
        let dict = enc.encryption_dictionary();
        assert_eq!(dict.get(b"Length").unwrap(), &Object::Integer(128));
        match dict.get(b"U").unwrap() {
            Object::String(u, _) => assert_eq!(u.len(), 32),
            other => panic!("unexpected /U {other:?}"),
        }
    }
}

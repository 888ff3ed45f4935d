use md5::{Digest, Md5};

/// Letter case of a rendered hex digest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashCase {
    #[default]
    Lower,
    Upper,
}

/// MD5 of `input`, rendered as hex in the requested case
pub fn md5_hex(input: &str, case: HashCase) -> String {
    let digest = Md5::digest(input.as_bytes());
    match case {
        HashCase::Lower => hex::encode(digest),
        HashCase::Upper => hex::encode_upper(digest),
    }
}

/// Constant-time string comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_reference_vector() {
        // Published Aliyun Type-A example
        let digest = md5_hex(
            "/video/standard/test.mp4-1444435200-0-0-aliyuncdnexp1234",
            HashCase::Lower,
        );
        assert_eq!(digest, "23bf85053008f5c0e791667a313e28ce");
    }

    #[test]
    fn test_md5_upper() {
        let digest = md5_hex(
            "/video/standard/test.mp4-1444435200-0-0-aliyuncdnexp1234",
            HashCase::Upper,
        );
        assert_eq!(digest, "23BF85053008F5C0E791667A313E28CE");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}

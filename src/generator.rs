/// Symbols a generated short code is drawn from.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of every generated short code.
pub const CODE_LENGTH: usize = 6;

/// Produces candidate short codes. Implementations know nothing about
/// storage, so a generated code may already be taken.
pub trait CodeGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Uniform random codes from the thread-local RNG, which is seeded from the
/// operating system on first use in every thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(CODE_LENGTH)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_code_length() {
        assert_eq!(RandomCodeGenerator.generate().len(), CODE_LENGTH);
    }

    #[test]
    fn test_code_alphabet() {
        for _ in 0..200 {
            let code = RandomCodeGenerator.generate();
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)), "unexpected symbol in {code}");
        }
    }

    #[test]
    fn test_codes_are_not_repeated() {
        // 38^6 possible codes, a thousand draws should not collide
        let codes: HashSet<String> = (0..1000).map(|_| RandomCodeGenerator.generate()).collect();
        assert!(codes.len() > 990);
    }

    #[test]
    fn test_generate_from_many_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..50).map(|_| RandomCodeGenerator.generate()).collect::<Vec<_>>()))
            .collect();
        let codes: HashSet<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert!(codes.len() > 190);
    }

    #[test]
    fn test_generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomCodeGenerator>();
    }
}

use rand::{distr::Alphanumeric, Rng};

pub fn generate_random_id(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Row ids are 26 characters wide, matching the ULIDs issued upstream.
pub fn generate_row_id() -> String {
    generate_random_id(26).to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_row_id() {
        let id = generate_row_id();
        assert_eq!(id.len(), 26);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
        assert_ne!(generate_row_id(), id);
    }
}

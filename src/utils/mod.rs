pub mod time;

/// Generates a random 21-character id for new records.
pub fn longid() -> String {
    nanoid::nanoid!()
}

/// Lowercases, trims and de-duplicates platform identifiers, keeping first-seen order.
pub fn normalize_platforms<S: AsRef<str>>(platforms: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(platforms.len());
    for p in platforms {
        let p = p.as_ref().trim().to_lowercase();
        if !p.is_empty() && !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longid_is_unique() {
        assert_ne!(longid(), longid());
        assert_eq!(longid().len(), 21);
    }

    #[test]
    fn test_normalize_platforms() {
        let platforms = normalize_platforms(&["eBay", " mercari ", "EBAY", "", "facebook"]);
        assert_eq!(platforms, vec!["ebay", "mercari", "facebook"]);
    }
}

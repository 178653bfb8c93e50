//! Storage naming: catalog field names are camelCase, PostgreSQL columns are snake_case.

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "organisationId" -> "organisation_id", "addedOn" -> "added_on"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn camel_to_snake() {
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("itemInStoreId"), "item_in_store_id");
        assert_eq!(to_snake_case("maxNumberOfReportsToGenerate"), "max_number_of_reports_to_generate");
    }
}

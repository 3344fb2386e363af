const BIOLINK_PREFIX: &str = "biolink:";

/// `biolink:ChemicalEntity` becomes `Chemical Entity`; several categories are joined with `or`.
pub fn display_category(categories: &[String]) -> String {
    categories
        .iter()
        .map(|category| split_camel_case(category.strip_prefix(BIOLINK_PREFIX).unwrap_or(category)))
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// `biolink:treats` becomes `treats`, `biolink:has_phenotype` becomes `has phenotype`.
pub fn display_predicate(predicate: &str) -> String {
    predicate
        .strip_prefix(BIOLINK_PREFIX)
        .unwrap_or(predicate)
        .replace('_', " ")
}

/// Bound identifiers of a node joined for display.
pub fn id_label(ids: &[String]) -> String {
    ids.join(", ")
}

fn split_camel_case(value: &str) -> String {
    let chars = value.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(value.len() + 4);
    for (index, current) in chars.iter().enumerate() {
        if index > 0 && current.is_uppercase() {
            let previous = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|next| next.is_lowercase());
            if previous.is_lowercase()
                || previous.is_ascii_digit()
                || (previous.is_uppercase() && next_is_lower)
            {
                out.push(' ');
            }
        }
        out.push(*current);
    }
    out
}

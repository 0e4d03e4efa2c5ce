//! Routes command - show the route table or classify paths.

use balagate_gateway::routes::{Classification, DEFAULT_ROUTES, RouteTable, normalize_path};

use crate::ui;

/// Print the route table, or the classification of each given path.
pub fn run_routes(paths: &[String]) {
    let table = DEFAULT_ROUTES;

    if paths.is_empty() {
        print_table(&table);
    } else {
        ui::header("Classification");
        for path in paths {
            ui::kv(path, &describe(&table, path));
        }
    }
}

fn print_table(table: &RouteTable) {
    ui::header("Route table (first match wins)");
    ui::table_row(&[("PATTERN", 20), ("MATCH", 10), ("TIER", 16)]);
    for rule in table.rules() {
        let kind = if rule.exact { "exact" } else { "prefix" };
        let tier = rule.tier.to_string();
        ui::table_row(&[(rule.pattern, 20), (kind, 10), (tier.as_str(), 16)]);
    }
    ui::info("Paths matching no rule are public");
}

/// One-line description of how a path is classified.
fn describe(table: &RouteTable, path: &str) -> String {
    let normalized = normalize_path(path);
    let classification = match table.classify(path) {
        Classification::OwnedResource(id) => format!("owned-resource (resource {id})"),
        other => other.tier().to_string(),
    };

    if normalized == path {
        classification
    } else {
        format!("{classification} (as {normalized})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&DEFAULT_ROUTES, "/admin"), "admin");
        assert_eq!(
            describe(&DEFAULT_ROUTES, "/courses/42"),
            "owned-resource (resource 42)"
        );
        assert_eq!(describe(&DEFAULT_ROUTES, "/"), "public");
        assert_eq!(describe(&DEFAULT_ROUTES, "//admin/"), "admin (as /admin)");
    }
}

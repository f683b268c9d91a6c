use irr_explorer::{find_least_specific_prefix, sort_and_group_panels, IrrExplorer};

/// Look up a prefix, group the answer by containment and follow up on the broadest match.
fn main() {
    println!("=== IRR Explorer Prefix Lookup Demo ===\n");

    let mut explorer = match IrrExplorer::new() {
        Ok(e) => e,
        Err(e) => {
            println!("✗ Failed to build client: {}", e);
            return;
        }
    };

    let prefix = "193.0.0.0/21";
    println!("Looking up {} at {}", prefix, explorer.base_url);

    let overlaps = match explorer.fetch_prefix_info(prefix) {
        Ok(overlaps) => overlaps,
        Err(e) => {
            println!("✗ Lookup failed: {}", e);
            return;
        }
    };
    println!("✓ {} overlapping prefixes", overlaps.len());

    let least_specific = find_least_specific_prefix(&overlaps);

    for group in sort_and_group_panels(overlaps) {
        for (depth, info) in group.flatten() {
            println!(
                "{}- {} [{}] origins {:?}",
                "  ".repeat(depth),
                info.prefix,
                info.category_overall,
                info.bgp_origins
            );
        }
    }

    if let Some(lsp) = least_specific {
        println!("\nLeast specific match: {}", lsp);
        match explorer.fetch_prefix_info(&lsp) {
            Ok(all) => println!("✓ {} prefixes overlap {}", all.len(), lsp),
            Err(e) => println!("✗ Follow-up failed: {}", e),
        }
    }

    explorer.close();
    println!("\n=== Lookup Complete ===");
}

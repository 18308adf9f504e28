use tracing::debug;

use crate::provider::{OutlineNode, PageProvider};
use crate::section::{Section, SectionIdGen, SectionSource};
use crate::session::{PassToken, Superseded};

/// Flattens a native outline tree into an ordered section list.
///
/// Walks the tree iteratively with an explicit `(node, level)` stack so a
/// pathologically deep bookmark tree cannot overflow the call stack.
/// Nodes without a resolvable in-bounds destination are skipped; their
/// children are still visited.
pub(crate) async fn flatten_outline<P: PageProvider>(
    provider: &P,
    roots: &[OutlineNode],
    ids: &mut SectionIdGen,
    token: &PassToken,
) -> Result<Vec<Section>, Superseded> {
    let page_count = provider.page_count();
    let mut sections = Vec::new();
    let mut stack: Vec<(&OutlineNode, u8)> = roots.iter().rev().map(|n| (n, 1)).collect();

    while let Some((node, level)) = stack.pop() {
        token.check()?;
        let mut page = None;
        let mut anchor_x = 0.0;
        let mut anchor_y = None;
        let mut destination = None;

        if let Some(dest) = &node.dest {
            match provider.resolve_destination(dest).await {
                Ok(Some(loc)) if loc.page >= 1 && loc.page <= page_count => {
                    page = Some(loc.page);
                    anchor_x = loc.x;
                    anchor_y = loc.y;
                    destination = Some(dest.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(dest, error = %e, "outline destination resolution failed");
                }
            }
        }

        if let Some(page) = page {
            let title = if node.title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                node.title.trim().to_string()
            };
            sections.push(Section {
                id: ids.next_id(),
                title,
                level: level.clamp(1, 3),
                page,
                anchor_x,
                anchor_y,
                destination,
                source: SectionSource::Outline,
            });
        }

        for child in node.children.iter().rev() {
            stack.push((child, level.saturating_add(1)));
        }
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_tree_flattens_in_preorder() {
        // Shape only; driving the async walk happens in the integration
        // tests. Here we check the stack discipline via a synchronous
        // mirror of the traversal.
        let tree = vec![OutlineNode {
            title: "1".into(),
            dest: None,
            children: vec![
                OutlineNode {
                    title: "1.1".into(),
                    dest: None,
                    children: vec![],
                },
                OutlineNode {
                    title: "1.2".into(),
                    dest: None,
                    children: vec![],
                },
            ],
        }];

        let mut order = Vec::new();
        let mut stack: Vec<(&OutlineNode, u8)> = tree.iter().rev().map(|n| (n, 1)).collect();
        while let Some((node, level)) = stack.pop() {
            order.push((node.title.clone(), level));
            for child in node.children.iter().rev() {
                stack.push((child, level + 1));
            }
        }
        assert_eq!(
            order,
            vec![("1".into(), 1), ("1.1".into(), 2), ("1.2".into(), 2)]
        );
    }
}

use crate::error::{PipelineError, Result};
use crate::gmail::ContentPart;

/// Collects the parts whose filename ends with `extension`, in pre-order.
///
/// Walks with an explicit stack. A tree nested deeper than `max_depth` (root is depth 0)
/// is rejected as a whole.
pub fn collect_attachments<'a>(
    root: &'a ContentPart,
    extension: &str,
    max_depth: usize,
) -> Result<Vec<&'a ContentPart>> {
    let mut selected = Vec::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((part, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(PipelineError::PartTreeTooDeep { limit: max_depth });
        }
        if part
            .filename
            .as_deref()
            .is_some_and(|name| name.ends_with(extension))
        {
            selected.push(part);
        }
        // Reversed so the first child is popped first.
        stack.extend(part.parts.iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> ContentPart {
        ContentPart {
            filename: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn node(filename: Option<&str>, parts: Vec<ContentPart>) -> ContentPart {
        ContentPart {
            filename: filename.map(str::to_string),
            body: None,
            parts,
        }
    }

    fn names(parts: &[&ContentPart]) -> Vec<String> {
        parts
            .iter()
            .filter_map(|part| part.filename.clone())
            .collect()
    }

    #[test]
    fn test_mixed_depths_are_returned_in_pre_order() {
        let tree = node(
            None,
            vec![
                node(
                    None,
                    vec![leaf("a.xlsx"), leaf("notes.txt"), node(None, vec![leaf("b.xlsx")])],
                ),
                leaf("c.xlsx"),
                node(Some("d.xlsx"), vec![leaf("e.xlsx"), leaf("f.pdf")]),
            ],
        );

        let found = collect_attachments(&tree, ".xlsx", 64).unwrap();

        assert_eq!(names(&found), vec!["a.xlsx", "b.xlsx", "c.xlsx", "d.xlsx", "e.xlsx"]);
    }

    #[test]
    fn test_root_itself_can_match() {
        let tree = leaf("only.xlsx");

        let found = collect_attachments(&tree, ".xlsx", 64).unwrap();

        assert_eq!(names(&found), vec!["only.xlsx"]);
    }

    #[test]
    fn test_suffix_match_is_exact() {
        let tree = node(
            None,
            vec![leaf("report.XLSX"), leaf("report.xlsx.txt"), leaf("xlsx"), leaf("ok.xlsx")],
        );

        let found = collect_attachments(&tree, ".xlsx", 64).unwrap();

        assert_eq!(names(&found), vec!["ok.xlsx"]);
    }

    #[test]
    fn test_no_parts_no_matches() {
        let tree = ContentPart::default();

        assert!(collect_attachments(&tree, ".xlsx", 64).unwrap().is_empty());
    }

    #[test]
    fn test_too_deep_tree_fails_closed() {
        let mut tree = leaf("deep.xlsx");
        for _ in 0..10 {
            tree = node(None, vec![tree]);
        }

        assert!(collect_attachments(&tree, ".xlsx", 10).is_ok());
        assert!(matches!(
            collect_attachments(&tree, ".xlsx", 9),
            Err(PipelineError::PartTreeTooDeep { limit: 9 })
        ));
    }
}

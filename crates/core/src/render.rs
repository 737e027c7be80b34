//! Text rendering of dependency trees.

use crate::tree::TreeNode;

/// Render a tree as indented ASCII art, one node per line:
///
/// ```text
/// App
/// ├── Core
/// │   └── Util
/// └── Data
/// ```
///
/// The walk is iterative, so rendering depth is bounded by tree size rather
/// than the call stack. The returned string ends with a newline.
pub fn render(tree: &TreeNode) -> String {
    let mut out = String::new();
    out.push_str(&tree.label);
    out.push('\n');

    // Children are pushed in reverse so they pop in display order.
    let mut stack: Vec<(&TreeNode, String, bool)> = Vec::new();
    push_children(&mut stack, tree, "");

    while let Some((node, prefix, last)) = stack.pop() {
        out.push_str(&prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&node.label);
        out.push('\n');

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        push_children(&mut stack, node, &child_prefix);
    }

    out
}

fn push_children<'a>(stack: &mut Vec<(&'a TreeNode, String, bool)>, node: &'a TreeNode, prefix: &str) {
    let count = node.children.len();
    for (idx, child) in node.children.iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), idx + 1 == count));
    }
}

/// Render a whole forest, trees separated the way they are printed: each
/// tree's block directly follows the previous one.
pub fn render_forest(trees: &[TreeNode]) -> String {
    trees.iter().map(render).collect()
}

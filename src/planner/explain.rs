//! Plan display
//!
//! Renders a plan as an indented tree, root first. Loop bodies are nested
//! under their loop; a node shared by several parents is printed once and
//! referenced afterwards.

use std::collections::HashSet;
use std::fmt::{self, Write};

use super::node::{NodeId, PlanKind, PlanNode};
use super::ExecutionPlan;

/// Format an execution plan for logs and debugging
pub struct ExplainOutput;

impl ExplainOutput {
    /// Format a plan as a string
    pub fn format(plan: &ExecutionPlan) -> String {
        let mut output = String::new();
        let mut printed = HashSet::new();
        // writing into a String cannot fail
        let _ = Self::format_node(plan, plan.root(), 0, &mut printed, &mut output);
        output
    }

    fn format_node(
        plan: &ExecutionPlan,
        id: NodeId,
        indent: usize,
        printed: &mut HashSet<NodeId>,
        out: &mut String,
    ) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        let Ok(node) = plan.node(id) else {
            return writeln!(out, "{}<missing node {}>", prefix, id);
        };
        if !printed.insert(id) {
            return writeln!(out, "{}{} #{} (see above)", prefix, node.name(), id);
        }

        writeln!(
            out,
            "{}{} #{} -> ${}{}",
            prefix,
            node.name(),
            id,
            node.output_var,
            Self::inputs(node)
        )?;
        Self::format_details(node, &prefix, out)?;

        if let PlanKind::Loop { body, .. } = &node.kind {
            writeln!(out, "{}  body:", prefix)?;
            Self::format_node(plan, *body, indent + 2, printed, out)?;
        }
        for dep in &node.deps {
            Self::format_node(plan, *dep, indent + 1, printed, out)?;
        }
        Ok(())
    }

    fn inputs(node: &PlanNode) -> String {
        if node.input_vars.is_empty() {
            return String::new();
        }
        let vars: Vec<String> = node.input_vars.iter().map(|v| format!("${}", v)).collect();
        format!(" <- {}", vars.join(", "))
    }

    fn format_details(node: &PlanNode, prefix: &str, out: &mut String) -> fmt::Result {
        match &node.kind {
            PlanKind::Start { seed } => {
                if let Some(seed) = seed {
                    writeln!(out, "{}  seed: {} rows", prefix, seed.len())?;
                }
            }
            PlanKind::Loop { condition, .. } => {
                writeln!(out, "{}  condition: {}", prefix, condition)?;
            }
            PlanKind::GetNeighbors {
                src,
                edge_types,
                direction,
                dedup,
            } => {
                writeln!(
                    out,
                    "{}  src: {}, edges: [{}], direction: {:?}, dedup: {}",
                    prefix,
                    src,
                    edge_types.join(", "),
                    direction,
                    dedup
                )?;
            }
            PlanKind::GetVertices {
                src,
                dedup,
                from_paths,
            } => {
                writeln!(
                    out,
                    "{}  src: {}, dedup: {}, from paths: {}",
                    prefix, src, dedup, from_paths
                )?;
            }
            PlanKind::Project { columns } => {
                let cols: Vec<String> = columns
                    .iter()
                    .map(|(e, alias)| format!("{} AS {}", e, alias))
                    .collect();
                writeln!(out, "{}  columns: [{}]", prefix, cols.join(", "))?;
            }
            PlanKind::InnerJoin {
                left_keys,
                right_keys,
            }
            | PlanKind::LeftJoin {
                left_keys,
                right_keys,
            } => {
                let l: Vec<String> = left_keys.iter().map(|e| e.to_string()).collect();
                let r: Vec<String> = right_keys.iter().map(|e| e.to_string()).collect();
                writeln!(out, "{}  on: [{}] = [{}]", prefix, l.join(", "), r.join(", "))?;
            }
            PlanKind::BfsShortestPath {
                steps,
                targets,
                continue_var,
            } => {
                write!(out, "{}  steps: {}, targets: {}", prefix, steps, targets.len())?;
                if let Some(var) = continue_var {
                    write!(out, ", continue: ${}", var)?;
                }
                writeln!(out)?;
            }
            PlanKind::ConjunctPath {
                kind,
                steps,
                conditional_var,
                no_loop,
            } => {
                write!(
                    out,
                    "{}  kind: {}, steps: {}, no loop: {}",
                    prefix, kind, steps, no_loop
                )?;
                if let Some(var) = conditional_var {
                    write!(out, ", conditional: ${}", var)?;
                }
                writeln!(out)?;
            }
            PlanKind::ProduceAllPaths { no_loop } => {
                writeln!(out, "{}  no loop: {}", prefix, no_loop)?;
            }
            PlanKind::Subgraph { steps, slots } => {
                writeln!(
                    out,
                    "{}  steps: {}, frontier: ${}, last step: ${}",
                    prefix, steps, slots.one_more_step_input, slots.last_step
                )?;
            }
            PlanKind::CartesianProduct { vars } => {
                writeln!(out, "{}  factors: {}", prefix, vars.len())?;
            }
            PlanKind::CreateTagIndex { def, .. } => {
                writeln!(out, "{}  index: {} on {}", prefix, def.name, def.tag)?;
            }
            PlanKind::DropTagIndex { name, .. }
            | PlanKind::DescTagIndex { name }
            | PlanKind::ShowCreateTagIndex { name } => {
                writeln!(out, "{}  index: {}", prefix, name)?;
            }
            PlanKind::Dedup
            | PlanKind::DataCollect
            | PlanKind::ProduceSemiShortestPath
            | PlanKind::ShowTagIndexes
            | PlanKind::ShowTagIndexStatus => {}
        }
        Ok(())
    }
}

//! Include graph ordering
//!
//! Computes the file processing order: every file's includes come before
//! the file itself. Include cycles and missing targets are fatal.

use crate::ParseError;
use basalt_ast::SourceFile;
use std::collections::HashMap;

/// Visit state for DFS cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    NotVisited,
    InProgress,
    Completed,
}

/// Compute a dependency order over `files`: the returned indices list every
/// file after all of its includes. Fails on include cycles (with the full
/// cycle path) and on includes that name no file in the set.
pub fn dependency_order(files: &[SourceFile]) -> Result<Vec<usize>, ParseError> {
    let by_path: HashMap<&str, usize> = files
        .iter()
        .enumerate()
        .map(|(i, f)| (f.path.as_str(), i))
        .collect();

    let mut state = vec![VisitState::NotVisited; files.len()];
    let mut path_stack: Vec<usize> = Vec::new();
    let mut order = Vec::with_capacity(files.len());

    for i in 0..files.len() {
        if state[i] == VisitState::NotVisited {
            visit(files, &by_path, i, &mut state, &mut path_stack, &mut order)?;
        }
    }

    Ok(order)
}

fn visit(
    files: &[SourceFile],
    by_path: &HashMap<&str, usize>,
    node: usize,
    state: &mut [VisitState],
    path_stack: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), ParseError> {
    state[node] = VisitState::InProgress;
    path_stack.push(node);

    for include in &files[node].includes {
        let dep = match by_path.get(include.path.as_str()) {
            Some(&dep) => dep,
            None => {
                return Err(ParseError::MissingInclude {
                    path: include.path.clone(),
                    span: include.span,
                })
            }
        };

        match state[dep] {
            VisitState::InProgress => {
                // Cycle: report the path from the first occurrence back here
                let cycle_start = path_stack.iter().position(|&i| i == dep).unwrap_or(0);
                let mut names: Vec<&str> = path_stack[cycle_start..]
                    .iter()
                    .map(|&i| files[i].path.as_str())
                    .collect();
                names.push(files[dep].path.as_str());
                return Err(ParseError::CircularInclude {
                    cycle: names.join(" -> "),
                    span: include.span,
                });
            }
            VisitState::NotVisited => {
                visit(files, by_path, dep, state, path_stack, order)?;
            }
            VisitState::Completed => {}
        }
    }

    path_stack.pop();
    state[node] = VisitState::Completed;
    order.push(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_ast::{FileId, IncludeDecl, Span};

    fn file(path: &str, includes: &[&str]) -> SourceFile {
        SourceFile {
            file: FileId(0),
            path: path.into(),
            includes: includes
                .iter()
                .map(|p| IncludeDecl {
                    path: (*p).into(),
                    span: Span::dummy(),
                })
                .collect(),
            declarations: Vec::new(),
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_includes_come_first() {
        let files = vec![file("main.blt", &["hal.blt"]), file("hal.blt", &[])];
        let order = dependency_order(&files).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let files = vec![
            file("main.blt", &["a.blt", "b.blt"]),
            file("a.blt", &["common.blt"]),
            file("b.blt", &["common.blt"]),
            file("common.blt", &[]),
        ];
        let order = dependency_order(&files).unwrap();
        let pos = |p: &str| order.iter().position(|&i| files[i].path == p).unwrap();
        assert!(pos("common.blt") < pos("a.blt"));
        assert!(pos("common.blt") < pos("b.blt"));
        assert!(pos("a.blt") < pos("main.blt"));
        assert!(pos("b.blt") < pos("main.blt"));
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let files = vec![file("a.blt", &["b.blt"]), file("b.blt", &["a.blt"])];
        let err = dependency_order(&files).unwrap_err();
        match err {
            ParseError::CircularInclude { cycle, .. } => {
                assert!(cycle.contains("a.blt") && cycle.contains("b.blt"));
            }
            other => panic!("expected CircularInclude, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let files = vec![file("main.blt", &["ghost.blt"])];
        let err = dependency_order(&files).unwrap_err();
        assert!(matches!(err, ParseError::MissingInclude { path, .. } if path == "ghost.blt"));
    }
}

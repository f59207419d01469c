use itertools::Itertools;

use crate::model::PopulationInstruction;

/// Resolve a raw `with` parameter against a resource's whitelist.
pub fn resolve_with(with: &str, whitelist: &[&str]) -> Vec<PopulationInstruction> {
    let requested: Vec<&str> = with.split(',').collect();
    resolve(&requested, whitelist)
}

/// Population instructions that are both requested and whitelisted.
///
/// Paths are matched against the whitelist verbatim. A nested path `parent.child`
/// only expands when the bare `parent` was accepted from the same request; a child
/// without its parent produces nothing. Only the first `.` splits a path, so
/// `a.b.c` nests `b.c` under `a` without resolving further. When several children
/// name one parent, the last one is kept.
pub fn resolve(requested: &[&str], whitelist: &[&str]) -> Vec<PopulationInstruction> {
    let permitted: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|path| whitelist.contains(path))
        .collect();

    let mut instructions: Vec<PopulationInstruction> = permitted
        .iter()
        .filter(|path| !path.contains('.'))
        .unique()
        .map(|path| PopulationInstruction::new(*path))
        .collect();

    for (parent, child) in permitted.iter().filter_map(|path| path.split_once('.')) {
        if let Some(instruction) = instructions.iter_mut().find(|i| i.path == parent) {
            instruction.populate = Some(Box::new(PopulationInstruction::new(child)));
        }
    }

    instructions
}

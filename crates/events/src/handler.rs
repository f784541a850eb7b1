/// Decide and evolve in one step, without persistence.
///
/// Runs `handle` and folds every returned event back into `aggregate`, which is
/// what the dispatcher does after a successful append. Used by domain tests and
/// by code that needs the post-command state without a store.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: loomworks_core::Aggregate,
{
    let events = aggregate.handle(command)?;
    for event in &events {
        aggregate.apply(event);
    }
    Ok(events)
}

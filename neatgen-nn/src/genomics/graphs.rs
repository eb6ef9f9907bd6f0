//! Directed graph queries over genome connections,
//! given as `(input node, output node)` pairs.
use crate::Innovation;

use std::collections::BTreeSet;

/// Returns whether adding the `test` connection would
/// create a cycle, assuming `connections` has none.
///
/// # Examples
/// ```
/// use neatgen_nn::genomics::creates_cycle;
///
/// let connections = [(0, 2), (2, 3), (3, 1)];
///
/// assert!(creates_cycle(connections, (1, 2)));
/// assert!(creates_cycle(connections, (3, 3)));
/// assert!(!creates_cycle(connections, (0, 3)));
/// ```
pub fn creates_cycle<I>(connections: I, test: (Innovation, Innovation)) -> bool
where
    I: IntoIterator<Item = (Innovation, Innovation)>,
    I::IntoIter: Clone,
{
    let (input, output) = test;
    if input == output {
        return true;
    }
    let connections = connections.into_iter();
    let mut visited = BTreeSet::from([output]);
    loop {
        let mut added = false;
        for (a, b) in connections.clone() {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == input {
                    return true;
                }
                visited.insert(b);
                added = true;
            }
        }
        if !added {
            return false;
        }
    }
}

/// Returns the nodes whose values are needed to compute
/// the `outputs`, the outputs included and the `inputs` excluded.
pub fn required_for_output(
    inputs: &[Innovation],
    outputs: &[Innovation],
    connections: &[(Innovation, Innovation)],
) -> BTreeSet<Innovation> {
    let mut required: BTreeSet<_> = outputs.iter().copied().collect();
    let mut reached = required.clone();
    loop {
        let frontier: BTreeSet<_> = connections
            .iter()
            .filter(|(a, b)| reached.contains(b) && !reached.contains(a))
            .map(|(a, _)| *a)
            .collect();
        let hidden: Vec<_> = frontier
            .iter()
            .filter(|n| !inputs.contains(n))
            .copied()
            .collect();
        if hidden.is_empty() {
            return required;
        }
        required.extend(hidden);
        reached.extend(frontier);
    }
}

/// Groups the nodes needed for the `outputs` into layers,
/// each of which depends only on the inputs and earlier layers.
///
/// Nodes whose value never reaches an output are left out.
///
/// # Examples
/// ```
/// use neatgen_nn::genomics::feed_forward_layers;
///
/// // 0, 1 -> 3 -> 2, with a dead-end node 4.
/// let layers = feed_forward_layers(&[0, 1], &[2], &[(0, 3), (1, 3), (3, 2), (1, 4)]);
///
/// assert_eq!(layers, vec![vec![3], vec![2]]);
/// ```
pub fn feed_forward_layers(
    inputs: &[Innovation],
    outputs: &[Innovation],
    connections: &[(Innovation, Innovation)],
) -> Vec<Vec<Innovation>> {
    let required = required_for_output(inputs, outputs, connections);

    let mut layers = vec![];
    let mut computed: BTreeSet<_> = inputs.iter().copied().collect();
    loop {
        let candidates: BTreeSet<_> = connections
            .iter()
            .filter(|(a, b)| computed.contains(a) && !computed.contains(b))
            .map(|(_, b)| *b)
            .collect();
        let layer: Vec<_> = candidates
            .into_iter()
            .filter(|n| required.contains(n))
            .filter(|n| {
                connections
                    .iter()
                    .filter(|(_, b)| b == n)
                    .all(|(a, _)| computed.contains(a))
            })
            .collect();
        if layer.is_empty() {
            return layers;
        }
        computed.extend(layer.iter().copied());
        layers.push(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cycle_in_chain_extensions() {
        let chain = [(0, 1), (1, 2), (2, 3)];
        assert!(!creates_cycle(chain, (0, 3)));
        assert!(!creates_cycle(chain, (4, 0)));
        assert!(creates_cycle(chain, (3, 0)));
        assert!(creates_cycle(chain, (2, 1)));
    }

    #[test]
    fn unreachable_inputs_are_not_required() {
        let required = required_for_output(&[0, 1], &[2], &[(0, 2), (5, 6), (3, 2), (1, 3)]);
        assert_eq!(required, BTreeSet::from([2, 3]));
    }

    #[test]
    fn layers_wait_for_all_inputs() {
        // 4 depends on 3, which depends only on inputs.
        let connections = [(0, 3), (0, 4), (3, 4), (4, 2), (1, 2)];
        let layers = feed_forward_layers(&[0, 1], &[2], &connections);
        assert_eq!(layers, vec![vec![3], vec![4], vec![2]]);
    }

    #[test]
    fn disconnected_outputs_have_no_layer() {
        assert!(feed_forward_layers(&[0, 1], &[2], &[]).is_empty());
    }
}

/// Post-order over the nodes reachable from `roots`: every node appears after all of its
/// inputs, and each node appears once. Ties are broken by input order, so the result is
/// deterministic for a given graph.
///
/// `inputs_of` must only return indices smaller than `len`.
pub(crate) fn reachable_post_order<F>(len: usize, roots: &[usize], inputs_of: F) -> Vec<usize>
where
    F: Fn(usize) -> Vec<usize>,
{
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Open,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; len];
    let mut order = Vec::with_capacity(len);
    let mut stack: Vec<(usize, Vec<usize>, usize)> = Vec::new();

    for &root in roots {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Open;
        stack.push((root, inputs_of(root), 0));

        while let Some((node, inputs, cursor)) = stack.last_mut() {
            if let Some(&next) = inputs.get(*cursor) {
                *cursor += 1;
                // An open input would mean a cycle; builders only reference earlier
                // nodes, so it is skipped rather than reported.
                if marks[next] == Mark::Unvisited {
                    marks[next] = Mark::Open;
                    let next_inputs = inputs_of(next);
                    stack.push((next, next_inputs, 0));
                }
            } else {
                let node = *node;
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::reachable_post_order;

    #[test]
    fn inputs_precede_consumers() {
        // 0 <- 1, 0 <- 2, (1, 2) <- 3
        let edges = [vec![], vec![0], vec![0], vec![1, 2]];
        let order = reachable_post_order(4, &[3], |idx| edges[idx].clone());
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unreachable_nodes_are_skipped() {
        let edges = [vec![], vec![], vec![0]];
        let order = reachable_post_order(3, &[2], |idx| edges[idx].clone());
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn shared_roots_are_visited_once() {
        let edges = [vec![], vec![0]];
        let order = reachable_post_order(2, &[1, 0, 1], |idx| edges[idx].clone());
        assert_eq!(order, vec![0, 1]);
    }
}

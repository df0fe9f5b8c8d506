// src/path_algorithms.rs - Shortest paths and longest-path reconstruction on the skeleton graph

use std::collections::{HashMap, HashSet, VecDeque};

use crate::skeleton_graph::{NodeId, SkeletonGraph};

/// Ordered node sequence; consecutive nodes are 8-adjacent
pub type Path = Vec<NodeId>;

/// Breadth-first shortest paths from `source` to every other reachable endpoint
///
/// Paths start at `source` and end at the endpoint, and are returned in the order
/// the endpoints were discovered. Ties between equally short routes go to whichever
/// neighbour comes first in the node's neighbour list.
///
/// # Arguments
/// * `graph` - Skeleton graph to search
/// * `source` - Endpoint to start from
///
/// # Returns
/// One path per reachable endpoint, excluding `source` itself
pub fn shortest_paths(graph: &SkeletonGraph, source: NodeId) -> Vec<Path> {
    let mut queue = VecDeque::new();
    let mut visited: HashMap<NodeId, NodeId> = HashMap::new(); // node -> previous node
    let mut reached = Vec::new();

    queue.push_back(source);
    visited.insert(source, source);

    while let Some(current) = queue.pop_front() {
        for &next in &graph.node(current).neighbors {
            if visited.contains_key(&next) {
                continue;
            }

            visited.insert(next, current);
            if graph.is_endpoint(next) {
                reached.push(next);
            }
            queue.push_back(next);
        }
    }

    reached
        .into_iter()
        .map(|target| {
            let mut backpath = vec![target];
            let mut current = target;
            while current != source {
                current = visited[&current];
                backpath.push(current);
            }
            backpath.reverse();
            backpath
        })
        .collect()
}

/// Stitch the longest path through the skeleton out of source-to-endpoint paths
///
/// Two paths sharing a root are cut down to their free branches, and the branches
/// are joined through the fork node adjacent to both of their nearest tips. The
/// longest stitched path wins; when no stitch beats it, the longest input path is
/// kept unchanged.
///
/// # Returns
/// `None` when `paths` is empty
pub fn merge_longest(graph: &SkeletonGraph, paths: &[Path]) -> Option<Path> {
    let mut longest: Option<&Path> = None;
    for path in paths {
        match longest {
            Some(best) if path.len() <= best.len() => {}
            _ => longest = Some(path),
        }
    }
    let mut longest = longest?.clone();

    for (i, path_i) in paths.iter().enumerate() {
        for (j, path_j) in paths.iter().enumerate() {
            if i == j {
                continue;
            }

            if let Some(stitched) = stitch_pair(graph, path_i, path_j) {
                if stitched.len() > longest.len() {
                    log::debug!(
                        "Stitched paths {} and {} into {} nodes",
                        i,
                        j,
                        stitched.len()
                    );
                    longest = stitched;
                }
            }
        }
    }

    Some(longest)
}

/// Join the free branches of two paths through their fork node
fn stitch_pair(graph: &SkeletonGraph, path_i: &[NodeId], path_j: &[NodeId]) -> Option<Path> {
    let nodes_i: HashSet<NodeId> = path_i.iter().copied().collect();
    let nodes_j: HashSet<NodeId> = path_j.iter().copied().collect();

    let mut branch_i: Path = path_i.iter().copied().filter(|n| !nodes_j.contains(n)).collect();
    let mut branch_j: Path = path_j.iter().copied().filter(|n| !nodes_i.contains(n)).collect();
    if branch_i.is_empty() || branch_j.is_empty() {
        return None;
    }

    let (tip_i_first, tip_j_first) = nearest_tips(graph, &branch_i, &branch_j);
    let tip_i = if tip_i_first { branch_i[0] } else { branch_i[branch_i.len() - 1] };
    let tip_j = if tip_j_first { branch_j[0] } else { branch_j[branch_j.len() - 1] };

    let neighbors_i = &graph.node(tip_i).neighbors;
    let fork = graph
        .node(tip_j)
        .neighbors
        .iter()
        .copied()
        .filter(|n| neighbors_i.contains(n))
        .last()?;

    // branch_j runs towards the fork, branch_i away from it
    if tip_j_first {
        branch_j.reverse();
    }
    if !tip_i_first {
        branch_i.reverse();
    }

    let mut stitched = branch_j;
    stitched.push(fork);
    stitched.extend(branch_i);
    Some(stitched)
}

/// Pick the closest pair of branch tips as (is first of `branch_i`, is first of `branch_j`)
fn nearest_tips(graph: &SkeletonGraph, branch_i: &[NodeId], branch_j: &[NodeId]) -> (bool, bool) {
    let tips = |branch: &[NodeId]| [branch[0], branch[branch.len() - 1]];
    let (ends_i, ends_j) = (tips(branch_i), tips(branch_j));

    let mut best = (true, true);
    let mut best_distance = u64::MAX;

    for (a, &tip_i) in ends_i.iter().enumerate() {
        for (b, &tip_j) in ends_j.iter().enumerate() {
            let distance = squared_distance(graph, tip_i, tip_j);
            if distance < best_distance {
                best_distance = distance;
                best = (a == 0, b == 0);
            }
        }
    }

    best
}

fn squared_distance(graph: &SkeletonGraph, a: NodeId, b: NodeId) -> u64 {
    let (ra, ca) = graph.node(a).pixel;
    let (rb, cb) = graph.node(b).pixel;
    let dr = ra.abs_diff(rb) as u64;
    let dc = ca.abs_diff(cb) as u64;
    dr * dr + dc * dc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::{set_foreground, Pixel};
    use image::GrayImage;

    fn graph_from_pixels(width: u32, height: u32, pixels: &[Pixel]) -> SkeletonGraph {
        let mut mask = GrayImage::new(width, height);
        for &p in pixels {
            set_foreground(&mut mask, p);
        }
        SkeletonGraph::build(&mask)
    }

    /// Stem down column 5, forking at (5, 5) into two diagonal arms of 5 pixels
    fn y_shape() -> SkeletonGraph {
        let mut pixels: Vec<Pixel> = (2..=5).map(|r| (r, 5)).collect();
        for k in 0..5 {
            pixels.push((6 + k, 4 - k));
            pixels.push((6 + k, 6 + k));
        }
        graph_from_pixels(12, 12, &pixels)
    }

    #[test]
    fn shortest_path_on_a_line_covers_every_pixel() {
        let pixels: Vec<Pixel> = (0..9).map(|c| (4, c)).collect();
        let graph = graph_from_pixels(10, 10, &pixels);

        let paths = shortest_paths(&graph, graph.endpoints[0]);
        assert_eq!(paths.len(), 1);
        assert_eq!(graph.path_pixels(&paths[0]), pixels);
    }

    #[test]
    fn shortest_path_prefers_the_diagonal() {
        // an L-shaped corner: the diagonal shortcut skips the corner pixel
        let pixels = [(1, 1), (2, 1), (3, 1), (3, 2), (3, 3)];
        let graph = graph_from_pixels(6, 6, &pixels);

        let paths = shortest_paths(&graph, graph.endpoints[0]);
        assert_eq!(paths.len(), 1);
        assert_eq!(graph.path_pixels(&paths[0]), vec![(1, 1), (2, 1), (3, 2), (3, 3)]);
    }

    #[test]
    fn isolated_source_reaches_nothing() {
        let graph = graph_from_pixels(4, 4, &[(1, 1)]);
        assert!(shortest_paths(&graph, graph.endpoints[0]).is_empty());
    }

    #[test]
    fn y_shape_paths_share_the_stem() {
        let graph = y_shape();
        let source = graph.endpoints[0];
        assert_eq!(graph.node(source).pixel, (2, 5));

        let paths = shortest_paths(&graph, source);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 9));
        assert_eq!(graph.node(*paths[0].last().unwrap()).pixel, (10, 0));
        assert_eq!(graph.node(*paths[1].last().unwrap()).pixel, (10, 10));
    }

    #[test]
    fn single_path_is_returned_unchanged() {
        let pixels: Vec<Pixel> = (1..7).map(|r| (r, 2)).collect();
        let graph = graph_from_pixels(5, 8, &pixels);
        let paths = shortest_paths(&graph, graph.endpoints[0]);

        assert_eq!(merge_longest(&graph, &paths), Some(paths[0].clone()));
    }

    #[test]
    fn y_shape_merges_both_arms_through_the_fork() {
        let graph = y_shape();
        let paths = shortest_paths(&graph, graph.endpoints[0]);
        let merged = merge_longest(&graph, &paths).unwrap();
        let pixels = graph.path_pixels(&merged);

        assert_eq!(merged.len(), 11);
        assert!(paths.iter().all(|p| merged.len() > p.len()));
        assert_eq!(pixels[0], (10, 10));
        assert_eq!(pixels[5], (5, 5));
        assert_eq!(pixels[10], (10, 0));

        for pair in pixels.windows(2) {
            assert!(pair[0].0.abs_diff(pair[1].0) <= 1);
            assert!(pair[0].1.abs_diff(pair[1].1) <= 1);
        }
    }

    #[test]
    fn no_paths_merge_to_nothing() {
        let graph = graph_from_pixels(3, 3, &[(1, 1)]);
        assert_eq!(merge_longest(&graph, &[]), None);
    }
}

// src/skeleton_graph.rs - Connectivity graph over a binary skeleton mask

use image::GrayImage;

use crate::errors::{BandingError, Result};
use crate::image_utils::{foreground_pixels, in_bounds, set_foreground, Pixel};
use crate::path_algorithms::{shortest_paths, Path};

pub type NodeId = usize;

/// Neighbour offsets as (row, column), in the order neighbours are linked
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Two or more neighbours
    Interior,
    /// Fewer than two neighbours, a free end of the curve
    Endpoint,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub pixel: Pixel,
    pub kind: NodeKind,
    pub neighbors: Vec<NodeId>,
}

/// A connected component, discovered from its first endpoint
#[derive(Debug, Clone)]
pub struct Cluster {
    pub source: NodeId,
    /// Shortest paths from `source` to every other endpoint of the component
    pub paths: Vec<Path>,
    /// Node count of the longest path in `paths`, 0 when there are none
    pub max_path_len: usize,
}

#[derive(Debug, Clone)]
pub struct SkeletonGraph {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<Node>,
    pub endpoints: Vec<NodeId>,
    pub clusters: Vec<Cluster>,
    node_at: Vec<Option<NodeId>>,
}

impl SkeletonGraph {
    /// Build the 8-connected graph of all foreground pixels and detect its clusters
    pub fn build(mask: &GrayImage) -> Self {
        let (width, height) = mask.dimensions();
        let pixels = foreground_pixels(mask);

        let mut node_at = vec![None; width as usize * height as usize];
        let mut nodes: Vec<Node> = pixels
            .iter()
            .enumerate()
            .map(|(id, &pixel)| {
                node_at[pixel.0 * width as usize + pixel.1] = Some(id);
                Node {
                    id,
                    pixel,
                    kind: NodeKind::Interior,
                    neighbors: Vec::new(),
                }
            })
            .collect();

        let mut graph = Self {
            width,
            height,
            nodes: Vec::new(),
            endpoints: Vec::new(),
            clusters: Vec::new(),
            node_at,
        };

        for node in nodes.iter_mut() {
            let (row, col) = (node.pixel.0 as isize, node.pixel.1 as isize);
            for &(dr, dc) in &NEIGHBOR_OFFSETS {
                if let Some(neighbor) = graph.node_id_at(row + dr, col + dc) {
                    node.neighbors.push(neighbor);
                }
            }

            if node.neighbors.len() < 2 {
                node.kind = NodeKind::Endpoint;
                graph.endpoints.push(node.id);
            }
        }

        graph.nodes = nodes;
        graph.clusters = graph.detect_clusters();

        log::debug!(
            "Skeleton graph: {} nodes, {} endpoints, {} clusters",
            graph.nodes.len(),
            graph.endpoints.len(),
            graph.clusters.len()
        );

        graph
    }

    /// Node at a (row, column) coordinate, if that pixel is foreground
    pub fn node_id_at(&self, row: isize, col: isize) -> Option<NodeId> {
        if !in_bounds(row, col, self.width, self.height) {
            return None;
        }
        self.node_at[row as usize * self.width as usize + col as usize]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn is_endpoint(&self, id: NodeId) -> bool {
        self.nodes[id].kind == NodeKind::Endpoint
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Node count of the longest endpoint-to-endpoint path over all clusters
    pub fn max_cluster_length(&self) -> usize {
        self.clusters.iter().map(|c| c.max_path_len).max().unwrap_or(0)
    }

    /// Cluster holding the longest discovered path, first one on ties
    pub fn dominant_cluster(&self) -> Result<&Cluster> {
        if self.nodes.is_empty() {
            return Err(BandingError::NoSkeletonPath("empty skeleton".to_string()));
        }
        if self.endpoints.is_empty() {
            return Err(BandingError::CircularStructure(
                "skeleton has no free end".to_string(),
            ));
        }

        let mut dominant: Option<&Cluster> = None;
        for cluster in &self.clusters {
            match dominant {
                Some(best) if cluster.max_path_len <= best.max_path_len => {}
                _ => dominant = Some(cluster),
            }
        }

        dominant.ok_or_else(|| BandingError::NoSkeletonPath("no cluster found".to_string()))
    }

    /// Convert a node path into pixel coordinates
    pub fn path_pixels(&self, path: &[NodeId]) -> Vec<Pixel> {
        path.iter().map(|&id| self.nodes[id].pixel).collect()
    }

    /// Partition the endpoints into connected clusters.
    ///
    /// The first pending endpoint seeds a breadth-first search; every endpoint it
    /// reaches belongs to the same cluster and is removed from the pending list.
    fn detect_clusters(&self) -> Vec<Cluster> {
        let mut pending = self.endpoints.clone();
        let mut clusters = Vec::new();

        while !pending.is_empty() {
            let source = pending.remove(0);
            let paths = shortest_paths(self, source);

            let mut max_path_len = 0;
            for path in &paths {
                max_path_len = max_path_len.max(path.len());
                if let Some(&other) = path.last() {
                    pending.retain(|&id| id != other);
                }
            }

            clusters.push(Cluster {
                source,
                paths,
                max_path_len,
            });
        }

        clusters
    }
}

/// Build the skeleton graph, synthesizing a second pixel when the skeleton is an
/// isolated point so that a minimal two-node path exists.
///
/// Returns the graph together with the (possibly extended) skeleton mask.
pub fn build_with_fallback(skeleton: &GrayImage) -> Result<(SkeletonGraph, GrayImage)> {
    let graph = SkeletonGraph::build(skeleton);

    if graph.nodes.is_empty() {
        return Err(BandingError::NoSkeletonPath(
            "empty image or empty skeleton".to_string(),
        ));
    }
    if graph.endpoints.is_empty() {
        return Err(BandingError::CircularStructure(
            "skeleton has no free end".to_string(),
        ));
    }
    if graph.max_cluster_length() >= 2 {
        return Ok((graph, skeleton.clone()));
    }

    let isolated = graph
        .endpoints
        .iter()
        .copied()
        .find(|&id| graph.node(id).neighbors.is_empty())
        .ok_or_else(|| {
            BandingError::CircularStructure("cluster only has one endpoint".to_string())
        })?;

    let (row, col) = graph.node(isolated).pixel;
    let companion = if row > 0 {
        (row - 1, col)
    } else if (row + 1) < skeleton.height() as usize {
        (row + 1, col)
    } else {
        return Err(BandingError::NoSkeletonPath(
            "single pixel skeleton in a one-row image".to_string(),
        ));
    };

    log::warn!(
        "Skeleton is a single pixel at {:?}, adding {:?} to form a path",
        (row, col),
        companion
    );

    let mut extended = skeleton.clone();
    set_foreground(&mut extended, companion);
    let graph = SkeletonGraph::build(&extended);

    Ok((graph, extended))
}

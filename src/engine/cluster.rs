use crate::engine::spatial::PointGrid;
use crate::engine::style::ClusterOptions;
use crate::error::MapError;
use crate::geo::{project_mercator, unproject_mercator, Bounds, LngLat};
use geojson::{FeatureCollection, Value};
use glam::DVec2;
use rayon::prelude::*;

/// Tile extent the cluster radius is expressed against
const EXTENT: f64 = 512.0;

/// Low bits of a cluster id hold the zoom it was formed at
const ZOOM_BITS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A single input point; index into the source's features
    Point { feature: usize },
    Cluster { id: u64 },
}

#[derive(Clone, Debug)]
struct Node {
    pos: DVec2,
    num_points: usize,
    kind: NodeKind,
    /// Indices into the next level up for clusters formed at this level
    children: Vec<usize>,
}

/// One entry of a [`ClusterIndex::clusters`] query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterFeature {
    pub lng_lat: LngLat,
    pub num_points: usize,
    pub kind: NodeKind,
}

/// Hierarchical greedy point clustering, one level per integer zoom.
///
/// Level `max_zoom + 1` holds the raw points. Each lower level merges the
/// nodes of the level above that fall within the cluster radius.
pub struct ClusterIndex {
    options: ClusterOptions,
    levels: Vec<Vec<Node>>,
}

impl ClusterIndex {
    /// Index the point features of a collection. Non-point geometries are skipped.
    pub fn build(data: &FeatureCollection, options: ClusterOptions) -> Self {
        let max_zoom = options.max_zoom.min((1 << ZOOM_BITS) - 2);
        let options = ClusterOptions { max_zoom, ..options };

        let points: Vec<Node> = data
            .features
            .par_iter()
            .enumerate()
            .filter_map(|(feature, f)| match f.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Point(coords)) => LngLat::from_position(coords).map(|p| Node {
                    pos: project_mercator(p),
                    num_points: 1,
                    kind: NodeKind::Point { feature },
                    children: Vec::new(),
                }),
                _ => None,
            })
            .collect();

        let mut levels = vec![Vec::new(); max_zoom as usize + 2];
        levels[max_zoom as usize + 1] = points;
        for zoom in (0..=max_zoom).rev() {
            levels[zoom as usize] = cluster_level(&levels[zoom as usize + 1], zoom, &options);
        }

        Self { options, levels }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.levels.last().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn level_for(&self, zoom: f64) -> &[Node] {
        let z = zoom.floor().clamp(0.0, (self.levels.len() - 1) as f64) as usize;
        &self.levels[z]
    }

    /// Clusters and unclustered points inside `bounds` at `zoom`
    pub fn clusters(&self, bounds: &Bounds, zoom: f64) -> Vec<ClusterFeature> {
        let (nw, se) = bounds.to_mercator();
        self.level_for(zoom)
            .iter()
            .filter(|n| n.pos.x >= nw.x && n.pos.x <= se.x && n.pos.y >= nw.y && n.pos.y <= se.y)
            .map(|n| ClusterFeature {
                lng_lat: unproject_mercator(n.pos),
                num_points: n.num_points,
                kind: n.kind,
            })
            .collect()
    }

    fn node(&self, cluster_id: u64) -> Result<(u8, &Node), MapError> {
        let zoom = (cluster_id & ((1 << ZOOM_BITS) - 1)) as usize;
        let idx = (cluster_id >> ZOOM_BITS) as usize;
        let node = self
            .levels
            .get(zoom)
            .filter(|_| zoom <= self.options.max_zoom as usize)
            .and_then(|level| level.get(idx))
            .filter(|n| n.kind == NodeKind::Cluster { id: cluster_id })
            .ok_or(MapError::UnknownCluster(cluster_id))?;
        Ok((zoom as u8, node))
    }

    /// Direct children of a cluster, one level up from where it formed
    pub fn children(&self, cluster_id: u64) -> Result<Vec<ClusterFeature>, MapError> {
        let (zoom, node) = self.node(cluster_id)?;
        let level = &self.levels[zoom as usize + 1];
        Ok(node
            .children
            .iter()
            .map(|&i| ClusterFeature {
                lng_lat: unproject_mercator(level[i].pos),
                num_points: level[i].num_points,
                kind: level[i].kind,
            })
            .collect())
    }

    /// Lowest zoom at which the cluster splits into more than one node
    pub fn expansion_zoom(&self, cluster_id: u64) -> Result<u8, MapError> {
        let mut id = cluster_id;
        loop {
            let (zoom, _) = self.node(id)?;
            let children = self.children(id)?;
            let expansion = zoom + 1;
            match children.as_slice() {
                [only] if expansion <= self.options.max_zoom => match only.kind {
                    NodeKind::Cluster { id: child } => id = child,
                    NodeKind::Point { .. } => return Ok(expansion),
                },
                _ => return Ok(expansion),
            }
        }
    }
}

fn cluster_level(above: &[Node], zoom: u8, options: &ClusterOptions) -> Vec<Node> {
    let radius = options.radius / (EXTENT * f64::from(zoom).exp2());
    let grid = PointGrid::build(above.iter().map(|n| n.pos), radius);
    let mut claimed = vec![false; above.len()];
    let mut level = Vec::with_capacity(above.len());

    for (i, node) in above.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;

        let neighbors: Vec<usize> = grid
            .within(node.pos, radius, |j| above[j].pos)
            .into_iter()
            .filter(|&j| !claimed[j])
            .collect();
        let total = node.num_points + neighbors.iter().map(|&j| above[j].num_points).sum::<usize>();

        if neighbors.is_empty() || total < options.min_points {
            level.push(Node {
                children: Vec::new(),
                ..node.clone()
            });
            continue;
        }

        let mut weighted = node.pos * node.num_points as f64;
        for &j in &neighbors {
            claimed[j] = true;
            weighted += above[j].pos * above[j].num_points as f64;
        }

        let id = ((level.len() as u64) << ZOOM_BITS) | u64::from(zoom);
        let mut children = Vec::with_capacity(neighbors.len() + 1);
        children.push(i);
        children.extend(neighbors);
        level.push(Node {
            pos: weighted / total as f64,
            num_points: total,
            kind: NodeKind::Cluster { id },
            children,
        });
    }

    level
}

/// Short count label: 999, 1.2k, 15k
pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

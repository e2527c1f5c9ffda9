use log::debug;
use ndarray::Array2;

/// Pixel adjacency rule for connected-component labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &[(-1, 0), (0, -1), (0, 1), (1, 0)],
            Connectivity::Eight => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

/// Connected regions of uniform value. Labels are assigned in raster scan
/// order of each region's first pixel, so label order is deterministic.
pub(crate) struct Regions {
    pub(crate) labels: Array2<usize>,
    pub(crate) values: Vec<i32>,
    pub(crate) sizes: Vec<usize>,
    pub(crate) neighbors: Vec<Vec<usize>>,
}

pub(crate) fn label_regions(data: &Array2<i32>, connectivity: Connectivity) -> Regions {
    let (rows, cols) = data.dim();
    let mut labels = Array2::from_elem((rows, cols), usize::MAX);
    let mut values: Vec<i32> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut neighbors: Vec<Vec<usize>> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[[row, col]] != usize::MAX {
                continue;
            }

            let label = values.len();
            let value = data[[row, col]];
            values.push(value);
            sizes.push(0);
            neighbors.push(Vec::new());

            labels[[row, col]] = label;
            stack.push((row, col));

            while let Some((r, c)) = stack.pop() {
                sizes[label] += 1;
                for &(dr, dc) in connectivity.offsets() {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if data[[nr, nc]] == value {
                        if labels[[nr, nc]] == usize::MAX {
                            labels[[nr, nc]] = label;
                            stack.push((nr, nc));
                        }
                    } else if labels[[nr, nc]] != usize::MAX {
                        // Earlier regions are fully labeled before this fill
                        // starts, so recording both directions here yields a
                        // complete adjacency relation.
                        let other = labels[[nr, nc]];
                        if !neighbors[label].contains(&other) {
                            neighbors[label].push(other);
                            neighbors[other].push(label);
                        }
                    }
                }
            }
        }
    }

    Regions {
        labels,
        values,
        sizes,
        neighbors,
    }
}

/// Remove connected regions smaller than `min_size` pixels by reassigning
/// them to the value of their largest adjacent region (ties go to the
/// earliest-labeled neighbor). Background regions (value 0) only ever act
/// as absorption targets; they are never reassigned themselves, so a
/// foreground block above threshold keeps its boundary even when the
/// surrounding background is small. One sweep over the regions in label
/// order; absorption accumulates through a union-find, so a merged region
/// counts toward later decisions, but no region is revisited. A region
/// with no distinct neighbor is left untouched regardless of size; an
/// image whose regions are all below threshold cascades into a single
/// region.
pub fn sieve(data: &Array2<i32>, min_size: usize, connectivity: Connectivity) -> Array2<i32> {
    let regions = label_regions(data, connectivity);
    let count = regions.values.len();
    debug!("Sieving {} regions below {} pixels", count, min_size);

    let mut parent: Vec<usize> = (0..count).collect();
    let mut sizes = regions.sizes.clone();
    let mut neighbors = regions.neighbors;

    for id in 0..count {
        if regions.values[id] == 0 || find(&mut parent, id) != id || sizes[id] >= min_size {
            continue;
        }

        let candidates = neighbors[id].clone();
        let mut target: Option<usize> = None;
        for nb in candidates {
            let root = find(&mut parent, nb);
            if root == id {
                continue;
            }
            let better = match target {
                None => true,
                Some(t) => sizes[root] > sizes[t] || (sizes[root] == sizes[t] && root < t),
            };
            if better {
                target = Some(root);
            }
        }

        let Some(target) = target else { continue };
        debug!(
            "Absorbing region {} ({} px) into region {} ({} px)",
            id, sizes[id], target, sizes[target]
        );
        parent[id] = target;
        sizes[target] += sizes[id];
        let absorbed = std::mem::take(&mut neighbors[id]);
        for nb in absorbed {
            if !neighbors[target].contains(&nb) {
                neighbors[target].push(nb);
            }
        }
    }

    let mut out = data.clone();
    for ((row, col), &label) in regions.labels.indexed_iter() {
        out[[row, col]] = regions.values[find(&mut parent, label)];
    }
    out
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

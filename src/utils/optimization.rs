//! Derivative-free minimization for the conditional sum of squares.

/// Best point found by [`nelder_mead`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    /// The simplex collapsed below `tolerance` before the iteration cap.
    pub converged: bool,
}

/// Simplex moves and stopping rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexOptions {
    pub max_iterations: usize,
    /// Stop when either the value spread or the simplex radius drops below.
    pub tolerance: f64,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
    /// Offset of the initial vertices, relative to non-zero coordinates.
    pub step: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-10,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

/// Minimize `objective` from `start` with the Nelder-Mead simplex.
///
/// Non-finite objective values count as `+∞`.
///
/// ```
/// use wavecast::utils::optimization::{nelder_mead, SimplexOptions};
///
/// let min = nelder_mead(|x| (x[0] - 0.4).powi(2) + 2.0 * (x[1] + 1.5).powi(2), &[0.0, 0.0], &SimplexOptions::default());
/// assert!(min.converged);
/// assert!((min.point[0] - 0.4).abs() < 1e-3);
/// assert!((min.point[1] + 1.5).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(objective: F, start: &[f64], options: &SimplexOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let dims = start.len();
    if dims == 0 {
        return Minimum {
            point: Vec::new(),
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let vertex = |point: Vec<f64>| {
        let value = objective(&point);
        Vertex {
            point,
            value: if value.is_finite() { value } else { f64::INFINITY },
        }
    };

    let mut simplex: Vec<Vertex> = std::iter::once(start.to_vec())
        .chain((0..dims).map(|i| {
            let mut point = start.to_vec();
            point[i] += if start[i].abs() > 1e-10 {
                options.step * start[i].abs()
            } else {
                options.step
            };
            point
        }))
        .map(&vertex)
        .collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        iterations += 1;
        simplex.sort_by(|a, b| a.value.total_cmp(&b.value));

        let centroid = centroid(&simplex[..dims]);
        let spread = simplex[dims].value - simplex[0].value;
        let radius = simplex
            .iter()
            .map(|v| crate::simd::squared_distance(&v.point, &centroid).sqrt())
            .fold(0.0, f64::max);
        if (spread.is_finite() && spread < options.tolerance) || radius < options.tolerance {
            converged = true;
            break;
        }

        let reflected = vertex(lerp(&centroid, &simplex[dims].point, -options.reflection));
        if reflected.value < simplex[0].value {
            let expanded = vertex(lerp(&centroid, &reflected.point, options.expansion));
            simplex[dims] = if expanded.value < reflected.value {
                expanded
            } else {
                reflected
            };
            continue;
        }
        if reflected.value < simplex[dims - 1].value {
            simplex[dims] = reflected;
            continue;
        }

        let outside = reflected.value < simplex[dims].value;
        let toward = if outside { &reflected } else { &simplex[dims] };
        let contracted = vertex(lerp(&centroid, &toward.point, options.contraction));
        if contracted.value < toward.value {
            simplex[dims] = contracted;
            continue;
        }

        let best = simplex[0].point.clone();
        for v in simplex.iter_mut().skip(1) {
            *v = vertex(lerp(&best, &v.point, options.shrink));
        }
    }

    let best = simplex
        .into_iter()
        .min_by(|a, b| a.value.total_cmp(&b.value))
        .unwrap_or_else(|| Vertex {
            point: start.to_vec(),
            value: f64::INFINITY,
        });
    Minimum {
        point: best.point,
        value: best.value,
        iterations,
        converged,
    }
}

/// Run [`nelder_mead`] again from the incumbent, up to `restarts` times,
/// until a round converges without improving by more than the tolerance.
pub fn minimize_with_restarts<F>(
    objective: F,
    start: &[f64],
    options: &SimplexOptions,
    restarts: usize,
) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let mut best = nelder_mead(&objective, start, options);
    for _ in 0..restarts {
        let next = nelder_mead(&objective, &best.point, options);
        let improved = next.value < best.value - options.tolerance;
        if next.value <= best.value {
            best = next;
        }
        if !improved && best.converged {
            break;
        }
    }
    best
}

fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let mut sum = vec![0.0; vertices[0].point.len()];
    for v in vertices {
        for (s, x) in sum.iter_mut().zip(&v.point) {
            *s += x;
        }
    }
    let n = vertices.len() as f64;
    sum.into_iter().map(|s| s / n).collect()
}

/// `from + t * (to - from)`.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

use crate::config::LayoutConfig;
use crate::model::{Direction, Node};
use tracing::debug;

use super::size::estimate_sizes;
use super::{Gaps, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
struct SizeStats {
    avg_width: f32,
    avg_height: f32,
    max_width: f32,
    max_height: f32,
}

/// Spacing for the layered layout, scaled by how crowded the viewport would be.
///
/// Density is node count over the number of average-sized nodes that fit in
/// the viewport at 50% fill, clamped and softened by `density_exponent`, so
/// crowded diagrams get tighter (but never degenerate) separations.
pub fn compute_gaps(nodes: &[Node], direction: Direction, config: &LayoutConfig) -> Gaps {
    let spacing = &config.spacing;
    let stats = size_stats(nodes, config);

    let viewport = config.viewport.unwrap_or(spacing.fallback_viewport);
    let density = density(nodes.len(), viewport, &stats, config);
    let density_adj = density.powf(spacing.density_exponent);

    let weights = spacing.weights(direction);
    let node_sep_base =
        stats.avg_width * weights.node_sep_avg + stats.max_width * weights.node_sep_max;
    let rank_sep_base =
        stats.avg_height * weights.rank_sep_avg + stats.max_height * weights.rank_sep_max;

    let margin = spacing
        .margin
        .clamp((stats.avg_width.min(stats.avg_height) * spacing.margin_ratio).round());
    let gaps = Gaps {
        node_sep: spacing.node_sep.clamp((node_sep_base / density_adj).round()),
        rank_sep: spacing.rank_sep.clamp((rank_sep_base / density_adj).round()),
        edge_sep: spacing
            .edge_sep
            .clamp(((stats.avg_width + stats.avg_height) * spacing.edge_sep_ratio).round()),
        margin_x: margin,
        margin_y: margin,
    };
    debug!(
        nodes = nodes.len(),
        direction = direction.as_str(),
        density,
        node_sep = gaps.node_sep,
        rank_sep = gaps.rank_sep,
        edge_sep = gaps.edge_sep,
        margin,
        "computed layout gaps"
    );
    gaps
}

fn size_stats(nodes: &[Node], config: &LayoutConfig) -> SizeStats {
    let sizes = estimate_sizes(nodes, &config.size);
    if sizes.is_empty() {
        let spacing = &config.spacing;
        return SizeStats {
            avg_width: spacing.fallback_width,
            avg_height: spacing.fallback_height,
            max_width: spacing.fallback_width,
            max_height: spacing.fallback_height,
        };
    }
    let count = sizes.len() as f32;
    let (sum_w, sum_h, max_w, max_h) = sizes.iter().fold(
        (0.0f32, 0.0f32, 0.0f32, 0.0f32),
        |(sum_w, sum_h, max_w, max_h), size| {
            (
                sum_w + size.width,
                sum_h + size.height,
                max_w.max(size.width),
                max_h.max(size.height),
            )
        },
    );
    SizeStats {
        avg_width: sum_w / count,
        avg_height: sum_h / count,
        max_width: max_w,
        max_height: max_h,
    }
}

fn density(count: usize, viewport: Viewport, stats: &SizeStats, config: &LayoutConfig) -> f32 {
    let spacing = &config.spacing;
    let viewport_area = (viewport.width * viewport.height).max(1.0);
    let node_area = (stats.avg_width * stats.avg_height).max(1.0);
    let capacity = (viewport_area / (spacing.capacity_factor * node_area)).max(f32::EPSILON);
    spacing.density.clamp(count as f32 / capacity)
}

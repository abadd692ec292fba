//! Compute kernels: WGSL source, entry points, uniform layout, dispatch sizing.
use bytemuck::{Pod, Zeroable};

/// WGSL module with every sampler kernel.
pub const POISSON_WGSL: &str = include_str!("../shaders/poisson.wgsl");

/// Workgroup width of the per-dart kernels.
pub const LINEAR_WORKGROUP_SIZE: u32 = 64;

/// Workgroup edge of the per-cell census kernel.
pub const CELL_WORKGROUP_SIZE: u32 = 8;

/// Entry points of [`POISSON_WGSL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    GenerateDarts,
    ThrowDarts,
    ResolveConflicts,
    CollectEmptyCells,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [
        Kernel::GenerateDarts,
        Kernel::ThrowDarts,
        Kernel::ResolveConflicts,
        Kernel::CollectEmptyCells,
    ];

    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::GenerateDarts => "generate_darts",
            Kernel::ThrowDarts => "throw_darts",
            Kernel::ResolveConflicts => "resolve_conflicts",
            Kernel::CollectEmptyCells => "collect_empty_cells",
        }
    }
}

/// Uniform block shared by every kernel. Mirrors `SamplerParams` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SamplerParams {
    pub width: u32,
    pub height: u32,
    pub dart_count: u32,
    pub pass_index: u32,
    pub dart_radius: f32,
    pub importance_floor: f32,
    pub seed: u32,
    pub capacity: u32,
    pub has_importance: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

const _: () = assert!(std::mem::size_of::<SamplerParams>() == 48);

/// Bytes per cell across the priority and coverage planes.
pub const FIELD_BYTES_PER_CELL: u64 = 8;
/// Candidate dart: position, radius, priority.
pub const CANDIDATE_BYTES: u64 = 16;
/// Accepted sample position.
pub const SAMPLE_BYTES: u64 = 8;
/// Four `u32` counters.
pub const COUNTERS_BYTES: u64 = 16;

/// Counter block read back after each stage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Counters {
    pub empty_count: u32,
    pub accepted: u32,
    pub overflow: u32,
    pub cursor: u32,
}

const _: () = assert!(std::mem::size_of::<Counters>() as u64 == COUNTERS_BYTES);

/// Workgroup counts for `items` invocations of a 64-wide kernel.
///
/// Large batches spill into the y dimension; kernels rebuild the flat index
/// from `num_workgroups`.
pub fn linear_dispatch(items: u32, max_per_dimension: u32) -> (u32, u32) {
    let groups = items.div_ceil(LINEAR_WORKGROUP_SIZE).max(1);
    let max = max_per_dimension.max(1);
    if groups <= max {
        (groups, 1)
    } else {
        (max, groups.div_ceil(max))
    }
}

/// Workgroup counts covering a `width` x `height` grid with 8x8 groups.
pub fn cell_dispatch(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(CELL_WORKGROUP_SIZE),
        height.div_ceil(CELL_WORKGROUP_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_dispatch_covers_all_items() {
        assert_eq!(linear_dispatch(1, 65_535), (1, 1));
        assert_eq!(linear_dispatch(64, 65_535), (1, 1));
        assert_eq!(linear_dispatch(65, 65_535), (2, 1));
        assert_eq!(linear_dispatch(0, 65_535), (1, 1));
    }

    #[test]
    fn linear_dispatch_spills_into_y() {
        let (x, y) = linear_dispatch(64 * 10, 4);
        assert_eq!((x, y), (4, 3));
        assert!(x * y * LINEAR_WORKGROUP_SIZE >= 640);
    }

    #[test]
    fn cell_dispatch_rounds_up() {
        assert_eq!(cell_dispatch(64, 64), (8, 8));
        assert_eq!(cell_dispatch(65, 1), (9, 1));
    }

    #[test]
    fn entry_points_exist_in_source() {
        for kernel in Kernel::ALL {
            let needle = format!("fn {}(", kernel.entry_point());
            assert!(POISSON_WGSL.contains(&needle), "missing {needle}");
        }
    }

    #[test]
    fn wgsl_module_validates() {
        let module = naga::front::wgsl::parse_str(POISSON_WGSL).expect("parse wgsl");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("validate wgsl");
    }

    #[test]
    fn uniform_layout_matches_shader() {
        let module = naga::front::wgsl::parse_str(POISSON_WGSL).expect("parse wgsl");
        let params = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("SamplerParams"))
            .map(|(_, ty)| ty.inner.clone())
            .expect("SamplerParams type");
        match params {
            naga::TypeInner::Struct { members, span } => {
                assert_eq!(span as usize, std::mem::size_of::<SamplerParams>());
                assert_eq!(members.len(), 12);
            }
            other => panic!("unexpected type {other:?}"),
        }
    }
}

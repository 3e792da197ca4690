//! Plane cache behavior under real driver workloads.
//!
//! The reslicer reads every plane once per output plane, which is the
//! access pattern the cache exists for. These tests stack a counting
//! source under [`CachingSource`] and assert how often the backing
//! store is actually hit.

use stackpipe::convert::{output_geometries, ConvertOptions, Converter, OrthogonalReslicer};
use stackpipe::geometry::Geometry;
use stackpipe::io::{CachingSource, MemorySink, MemorySource};

use super::test_utils::{encoded_volume, init_logging, sample_u16, CountingSource};

fn counting_volume(width: u32, height: u32, depth: u32) -> (CountingSource, Geometry) {
    let (geometry, planes) = encoded_volume(width, height, depth);
    let source = CountingSource::new(MemorySource::single("mem://vol", geometry, planes).unwrap());
    (source, geometry)
}

#[tokio::test]
async fn test_reslice_fetches_each_plane_once_when_cache_fits() {
    init_logging();
    let (counting, geometry) = counting_volume(6, 5, 4);
    let mut cached = CachingSource::new(counting);
    let (xz, yz) = output_geometries(&geometry).unwrap();
    let mut sink = MemorySink::open("mem://ortho", vec![xz, yz]).unwrap();

    let report = OrthogonalReslicer::new()
        .run(&mut cached, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.xz_planes, 5);
    assert_eq!(report.yz_planes, 6);
    // 44 strip reads collapse into one backing fetch per plane
    assert_eq!(cached.inner().plane_reads(), 4);
    assert_eq!(cached.inner().region_reads(), 0);

    // spot-check the output is still correct through the cache
    let plane = sink.plane_data(0, 2).unwrap();
    for z in 0..4u32 {
        for x in 0..6u32 {
            assert_eq!(sample_u16(plane, 6, x, z), (x + 20 + 100 * z) as u16);
        }
    }
}

#[tokio::test]
async fn test_undersized_cache_degrades_to_per_strip_fetches() {
    init_logging();
    // 60-byte planes against a 100-byte budget: each fetch evicts the
    // previous plane before it can be reused
    let (counting, geometry) = counting_volume(6, 5, 4);
    let mut cached = CachingSource::with_capacity(counting, 100);
    let (xz, yz) = output_geometries(&geometry).unwrap();
    let mut sink = MemorySink::open("mem://ortho", vec![xz, yz]).unwrap();

    OrthogonalReslicer::new()
        .run(&mut cached, &mut sink)
        .await
        .unwrap();

    // 5 XZ planes x 4 slices + 6 YZ planes x 4 slices, every one a miss
    assert_eq!(cached.inner().plane_reads(), 44);
    assert_eq!(cached.inner().region_reads(), 0);
}

#[tokio::test]
async fn test_untiled_conversion_reads_each_plane_once() {
    init_logging();
    let (counting, geometry) = counting_volume(8, 8, 3);
    let mut cached = CachingSource::new(counting);
    let mut sink = MemorySink::single("mem://dst", geometry).unwrap();

    let report = Converter::new(ConvertOptions::new())
        .run(&mut cached, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.planes_written, 3);
    assert_eq!(cached.inner().plane_reads(), 3);
    assert_eq!(cached.inner().region_reads(), 0);
}

//! End-to-end conversion tests.
//!
//! Covers whole-plane and tiled transfers, clipped tile grids, the
//! skip-and-continue policy for failing units, and close behavior.

use stackpipe::convert::{ConversionReport, ConvertOptions, Converter, SkippedUnit};
use stackpipe::error::ConvertError;
use stackpipe::geometry::{Geometry, PixelType};
use stackpipe::io::{MemorySink, MemorySource};
use stackpipe::tile::Tile;

use super::test_utils::{byte_planes, encoded_volume, init_logging, FlakySink, FlakySource};

#[tokio::test]
async fn test_untiled_conversion_copies_every_series() {
    init_logging();
    let (volume, volume_planes) = encoded_volume(6, 4, 3);
    let flat = Geometry::new(16, 16, PixelType::Uint8).with_channels(2);
    let flat_planes = byte_planes(&flat);

    let mut source = MemorySource::open(
        "mem://src",
        vec![
            (volume, volume_planes.clone()),
            (flat, flat_planes.clone()),
        ],
    )
    .unwrap();
    let mut sink = MemorySink::open("mem://dst", vec![volume, flat]).unwrap();

    let report = Converter::default().run(&mut source, &mut sink).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.series_converted, 2);
    assert_eq!(report.planes_written, 5);
    for (p, plane) in volume_planes.iter().enumerate() {
        assert_eq!(sink.plane_data(0, p).unwrap(), plane.as_ref());
    }
    for (p, plane) in flat_planes.iter().enumerate() {
        assert_eq!(sink.plane_data(1, p).unwrap(), plane.as_ref());
    }
    assert!(source.is_closed());
    assert!(sink.is_closed());
}

#[tokio::test]
async fn test_exact_tile_grid_has_no_clipped_tiles() {
    init_logging();
    let g = Geometry::new(1024, 1024, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = MemorySource::single("mem://src", g, planes.clone()).unwrap();
    let mut sink = MemorySink::single("mem://dst", g).unwrap();

    let converter = Converter::new(ConvertOptions::new().with_tile_size(256, 256));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    // 4x4 grid, every tile exactly 256x256
    assert_eq!(report.tiles_written, 16);
    assert!(report.is_complete());
    assert_eq!(sink.plane_data(0, 0).unwrap(), planes[0].as_ref());
}

#[tokio::test]
async fn test_clipped_tile_grid_covers_plane() {
    init_logging();
    let g = Geometry::new(1024, 1024, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = MemorySource::single("mem://src", g, planes.clone()).unwrap();
    let mut sink = MemorySink::single("mem://dst", g).unwrap();

    let converter = Converter::new(ConvertOptions::new().with_tile_size(256, 192));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    // 4 columns x 6 rows; the last row is clipped to 1024 - 5*192 = 64
    assert_eq!(report.tiles_written, 24);
    assert_eq!(sink.plane_data(0, 0).unwrap(), planes[0].as_ref());
}

#[tokio::test]
async fn test_rejected_series_skips_but_converts_the_rest() {
    init_logging();
    let g = Geometry::new(8, 8, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = MemorySource::open(
        "mem://src",
        vec![(g, planes.clone()), (g, byte_planes(&g))],
    )
    .unwrap();
    // The sink only knows one series; series 1 must be skipped, not fatal
    let mut sink = MemorySink::single("mem://dst", g).unwrap();

    let report = Converter::default().run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.series_converted, 1);
    assert_eq!(sink.plane_data(0, 0).unwrap(), planes[0].as_ref());
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(
        report.skipped[0],
        SkippedUnit::Series { series: 1, .. }
    ));
}

#[tokio::test]
async fn test_tile_read_failure_skips_only_that_tile() {
    init_logging();
    let g = Geometry::new(64, 64, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = FlakySource::new(MemorySource::single("mem://src", g, planes.clone()).unwrap())
        .with_failing_region(0, 0, 32, 0);
    let mut sink = MemorySink::single("mem://dst", g).unwrap();

    let converter = Converter::new(ConvertOptions::new().with_tile_size(32, 32));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.tiles_written, 3);
    assert_eq!(report.skipped.len(), 1);
    match &report.skipped[0] {
        SkippedUnit::Tile {
            series, plane, tile, ..
        } => {
            assert_eq!((*series, *plane), (0, 0));
            assert_eq!(
                *tile,
                Tile {
                    x: 32,
                    y: 0,
                    width: 32,
                    height: 32
                }
            );
        }
        other => panic!("expected a skipped tile, got {:?}", other),
    }

    let written = sink.plane_data(0, 0).unwrap();
    let expected = planes[0].as_ref();
    // Failed tile stays zeroed, every other pixel arrived intact
    for y in 0..64u32 {
        for x in 0..64u32 {
            let i = (x + 64 * y) as usize;
            if x >= 32 && y < 32 {
                assert_eq!(written[i], 0);
            } else {
                assert_eq!(written[i], expected[i]);
            }
        }
    }
}

#[tokio::test]
async fn test_tile_write_failure_skips_only_that_tile() {
    init_logging();
    let g = Geometry::new(64, 64, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = MemorySource::single("mem://src", g, planes.clone()).unwrap();
    let mut sink = FlakySink::new(MemorySink::single("mem://dst", g).unwrap())
        .with_failing_region(0, 0, 32, 32);

    let converter = Converter::new(ConvertOptions::new().with_tile_size(32, 32));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.tiles_written, 3);
    assert!(matches!(
        report.skipped[0],
        SkippedUnit::Tile {
            series: 0,
            plane: 0,
            tile: Tile {
                x: 32,
                y: 32,
                width: 32,
                height: 32
            },
            ..
        }
    ));
    let written = sink.inner().plane_data(0, 0).unwrap();
    assert_eq!(&written[..32], &planes[0][..32]);
    assert!(written[(32 + 64 * 32)..(64 + 64 * 32)].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn test_plane_write_failure_skips_only_that_plane() {
    init_logging();
    let (g, planes) = encoded_volume(8, 8, 3);
    let mut source = MemorySource::single("mem://src", g, planes.clone()).unwrap();
    let mut sink =
        FlakySink::new(MemorySink::single("mem://dst", g).unwrap()).with_failing_plane(0, 1);

    let report = Converter::default().run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.planes_written, 2);
    assert!(matches!(
        report.skipped[0],
        SkippedUnit::Plane {
            series: 0,
            plane: 1,
            ..
        }
    ));
    assert_eq!(sink.inner().plane_data(0, 0).unwrap(), planes[0].as_ref());
    assert_eq!(sink.inner().plane_data(0, 2).unwrap(), planes[2].as_ref());
    assert!(sink.inner().plane_data(0, 1).unwrap().iter().all(|&b| b == 0));
}

#[tokio::test]
async fn test_sink_close_failure_surfaces_after_success() {
    init_logging();
    let g = Geometry::new(4, 4, PixelType::Uint8);
    let mut source = MemorySource::single("mem://src", g, byte_planes(&g)).unwrap();
    let mut sink =
        FlakySink::new(MemorySink::single("mem://dst", g).unwrap()).with_failing_close();

    let err = Converter::default().run(&mut source, &mut sink).await.unwrap_err();

    match err {
        ConvertError::SinkClose(e) => assert_eq!(e.locator, "mem://dst"),
        other => panic!("expected a sink close error, got {:?}", other),
    }
    // The source close still happened
    assert!(source.is_closed());
}

#[tokio::test]
async fn test_sink_tile_granularity_respected() {
    init_logging();
    let g = Geometry::new(512, 512, PixelType::Uint8);
    let planes = byte_planes(&g);
    let mut source = MemorySource::single("mem://src", g, planes.clone()).unwrap();
    let mut sink = MemorySink::single("mem://dst", g)
        .unwrap()
        .with_tile_granularity(16);

    // 100x100 is not a legal tile for this sink; it rounds to 96x96
    let converter = Converter::new(ConvertOptions::new().with_tile_size(100, 100));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.tiles_written, 36);
    assert_eq!(sink.plane_data(0, 0).unwrap(), planes[0].as_ref());
}

#[tokio::test]
async fn test_report_round_trips_through_json() {
    init_logging();
    let g = Geometry::new(64, 64, PixelType::Uint8);
    let mut source = FlakySource::new(MemorySource::single("mem://src", g, byte_planes(&g)).unwrap())
        .with_failing_region(0, 0, 0, 32);
    let mut sink = MemorySink::single("mem://dst", g).unwrap();

    let converter = Converter::new(ConvertOptions::new().with_tile_size(32, 32));
    let report = converter.run(&mut source, &mut sink).await.unwrap();

    let json = serde_json::to_string(&report).unwrap();
    let parsed: ConversionReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.series_converted, report.series_converted);
    assert_eq!(parsed.tiles_written, report.tiles_written);
    assert_eq!(parsed.skipped, report.skipped);
}

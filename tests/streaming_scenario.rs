use cgmath::Point3;
use web_time::{Duration, Instant};

use voxel_streamer::config::EngineConfig;
use voxel_streamer::engine_state::{
    rendering::gpu::{HeadlessDevice, RenderError},
    voxels::{
        chunk::{coord::ChunkCoord, CHUNK_SIZE},
        chunk_manager::{ActivePhase, ChunkState},
    },
    EngineState,
};

const STEP: Duration = Duration::from_millis(16);

fn config(radius: i32, workers: usize) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.streaming.visible_radius = radius;
    config.streaming.worker_threads = workers;
    config.terrain.seed = 7;
    config
}

fn chunk_center(x: i32, z: i32) -> Point3<f32> {
    let size = CHUNK_SIZE as f32;
    Point3::new((x as f32 + 0.5) * size, 40.0, (z as f32 + 0.5) * size)
}

/// Runs frames until every desired chunk is active and uploaded.
fn settle(engine: &mut EngineState<HeadlessDevice>, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let stats = engine.frame(STEP).unwrap();
        if stats.generating == 0 && stats.active == expected && stats.drawn == expected {
            return;
        }
        assert!(Instant::now() < deadline, "streaming did not settle: {stats:?}");
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

fn active_coords(engine: &EngineState<HeadlessDevice>) -> Vec<ChunkCoord> {
    let mut coords: Vec<_> = engine
        .chunk_manager()
        .active_chunks()
        .get()
        .keys()
        .copied()
        .collect();
    coords.sort_unstable();
    coords
}

fn assert_mesh_integrity(engine: &EngineState<HeadlessDevice>) {
    for chunk in engine.chunk_manager().active_chunks().get().values() {
        let mesh = chunk.mesh();
        let vertices = mesh.vertex_count();
        assert_eq!(mesh.positions().len(), vertices * 3);
        assert_eq!(mesh.normals().len(), vertices * 3);
        assert_eq!(mesh.colors().len(), vertices * 3);
        assert_eq!(mesh.index_count() % 3, 0);
        assert!(mesh.indices().iter().all(|&index| (index as usize) < vertices));
    }
}

#[test]
fn inline_generation_streams_a_moving_window() {
    let mut engine = EngineState::new(&config(1, 0), HeadlessDevice::new(), chunk_center(0, 0));
    settle(&mut engine, 9);

    let expected: Vec<_> = (-1..=1)
        .flat_map(|x| (-1..=1).map(move |z| ChunkCoord::new(x, z)))
        .collect();
    assert_eq!(active_coords(&engine), expected);
    assert_eq!(
        engine.chunk_manager().chunk_state(ChunkCoord::new(0, 0)),
        ChunkState::Active(ActivePhase::Rendered)
    );
    assert_mesh_integrity(&engine);

    let retained_id = engine.chunk_manager().active_chunks().get()[&ChunkCoord::new(1, 1)].chunk_id;
    engine.camera_state.camera.position = chunk_center(1, 0);
    settle(&mut engine, 9);

    let coords = active_coords(&engine);
    assert!(coords.iter().all(|coord| (0..=2).contains(&coord.x)));
    assert_eq!(
        engine.chunk_manager().active_chunks().get()[&ChunkCoord::new(1, 1)].chunk_id,
        retained_id
    );
    assert_eq!(engine.renderer().chunks_uploaded(), 12);
    assert_eq!(engine.renderer().chunks_released(), 3);

    assert_eq!(engine.shutdown().unwrap(), 9);
    let device = engine.renderer().device();
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.live_vertex_arrays(), 0);
    assert_eq!(device.allocated_bytes(), 0);
}

#[test]
fn worker_threads_produce_the_same_world() {
    let mut inline = EngineState::new(&config(1, 0), HeadlessDevice::new(), chunk_center(4, -2));
    let mut threaded = EngineState::new(&config(1, 3), HeadlessDevice::new(), chunk_center(4, -2));
    settle(&mut inline, 9);
    settle(&mut threaded, 9);

    assert_eq!(active_coords(&inline), active_coords(&threaded));
    {
        let inline_chunks = inline.chunk_manager().active_chunks().get();
        let threaded_chunks = threaded.chunk_manager().active_chunks().get();
        for (coord, chunk) in inline_chunks.iter() {
            let other = &threaded_chunks[coord];
            assert_eq!(chunk.mesh(), other.mesh(), "chunk {coord} differs");
            assert_eq!(chunk.room(), other.room());
        }
    }
    assert_eq!(
        inline.renderer().device().allocated_bytes(),
        threaded.renderer().device().allocated_bytes()
    );

    inline.shutdown().unwrap();
    threaded.shutdown().unwrap();
}

#[test]
fn fast_camera_discards_stale_work_under_threads() {
    let mut engine = EngineState::new(&config(1, 2), HeadlessDevice::new(), chunk_center(0, 0));
    engine.frame(STEP).unwrap();

    // Jump far away before the first window could finish.
    engine.camera_state.camera.position = chunk_center(50, 50);
    settle(&mut engine, 9);

    let coords = active_coords(&engine);
    assert!(coords.iter().all(|coord| (49..=51).contains(&coord.x)));

    // Stale tasks may still be running; wait until every result is back.
    let deadline = Instant::now() + Duration::from_secs(30);
    while !(engine.chunk_manager().task_manager().is_idle()
        && engine.chunk_manager().pending_count() == 0)
    {
        assert!(Instant::now() < deadline, "workers did not drain");
        std::thread::sleep(std::time::Duration::from_millis(1));
        engine.frame(STEP).unwrap();
    }

    // Every dispatch either became a chunk, was discarded or was evicted
    // after committing.
    let manager = engine.chunk_manager();
    let accounted = manager.active_count() as u64
        + manager.discarded_count()
        + engine.renderer().chunks_released();
    assert_eq!(accounted, 18);

    engine.shutdown().unwrap();
    assert_eq!(engine.renderer().device().live_buffers(), 0);
}

#[test]
fn exhausted_device_surfaces_an_error() {
    let mut engine = EngineState::new(
        &config(0, 0),
        HeadlessDevice::with_byte_budget(512),
        chunk_center(0, 0),
    );
    let err = engine.frame(STEP).unwrap_err();
    assert!(matches!(err, RenderError::OutOfMemory { .. }));
    assert_eq!(engine.renderer().device().live_buffers(), 0);
    assert_eq!(engine.renderer().chunks_uploaded(), 0);
}

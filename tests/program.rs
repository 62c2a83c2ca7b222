mod framework;

use anyhow::Result;

use descriptor_cache::{DescriptorCategory, Error, PoolSettings, ProgramDescriptors};
use framework::*;

#[test]
fn builds_one_pool_per_category() -> Result<()> {
    let backend = MockBackend::new();
    let program =
        ProgramDescriptors::new(backend.clone(), &graphics_stages(2), PoolSettings::default())?;

    // Real pools where the stages declare bindings, null pools elsewhere.
    for category in [
        DescriptorCategory::Ubo,
        DescriptorCategory::SamplerView,
        DescriptorCategory::Ssbo,
        DescriptorCategory::Image,
    ] {
        assert!(program.has_pool(category));
    }
    assert_eq!(program.descriptor_count(DescriptorCategory::Ubo), Some(2));
    assert_eq!(program.descriptor_count(DescriptorCategory::SamplerView), Some(1));
    assert_eq!(program.descriptor_count(DescriptorCategory::Ssbo), Some(0));
    assert_eq!(program.descriptor_count(DescriptorCategory::Image), Some(0));

    let stats = backend.stats.lock().unwrap();
    assert_eq!(stats.pools_created, 4);
    assert_eq!(stats.layouts_created, 4);
    Ok(())
}

#[test]
fn no_descriptor_program_builds_no_pools() -> Result<()> {
    let backend = MockBackend::new();
    let mut program = ProgramDescriptors::new(backend.clone(), &[], PoolSettings::default())?;

    assert!(!program.has_pool(DescriptorCategory::Ubo));
    assert_eq!(backend.stats.lock().unwrap().pools_created, 0);

    let mut batch = MockBatch::new();
    let err = program
        .get(&mut batch, &gfx_key(1, 1), DescriptorCategory::Ubo, false)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NoPool(DescriptorCategory::Ubo))
    ));
    Ok(())
}

#[test]
fn pool_creation_failure_leaks_nothing() {
    let backend = MockBackend::new();
    backend.limit_pool_creations(2);

    let result =
        ProgramDescriptors::new(backend.clone(), &graphics_stages(1), PoolSettings::default());
    assert!(result.is_err());

    // Every native object created before the failure was torn down again.
    let stats = backend.stats.lock().unwrap();
    assert_eq!(stats.pools_created, 2);
    assert_eq!(stats.pools_destroyed, stats.pools_created);
    assert_eq!(stats.layouts_destroyed, stats.layouts_created);
}

#[test]
fn dropping_the_program_invalidates_outstanding_refs() -> Result<()> {
    let backend = MockBackend::new();
    let mut program =
        ProgramDescriptors::new(backend.clone(), &graphics_stages(1), PoolSettings::default())?;
    let mut batch = MockBatch::new();

    let (set, _) = program.get(&mut batch, &gfx_key(1, 1), DescriptorCategory::Ubo, false)?;
    assert!(!set.is_invalid());

    drop(program);
    assert!(set.is_invalid());
    let stats = backend.stats.lock().unwrap();
    assert_eq!(stats.pools_destroyed, 4);
    assert_eq!(stats.layouts_destroyed, 4);
    Ok(())
}

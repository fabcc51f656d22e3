use std::ptr::NonNull;

use slabloc::{AllocError, Pool, Router};

fn print_alloc(label: &str, block: NonNull<[u8]>) {
    println!("{label}: {} bytes at {:?}", block.len(), block.cast::<u8>());
}

fn pool_walkthrough() -> Result<(), AllocError> {
    println!("Pool of 16 byte blocks, 4 blocks per buffer.");
    let mut pool = Pool::new(16, 4);

    let mut blocks = Vec::new();
    for i in 0..4 {
        let block = pool.allocate(16)?;
        print_alloc(&format!("block {i}"), block);
        blocks.push(block);
    }

    let extra = pool.allocate(16)?;
    print_alloc("extra block (new buffer)", extra);
    println!("buffers in use: {}", pool.num_buffers());

    for (i, block) in blocks.into_iter().enumerate() {
        pool.release(Some(block.cast()))?;
        println!("released block {i}");
    }
    pool.release(Some(extra.cast()))?;
    println!("released extra block");

    pool.teardown();
    println!("pool cleaned up, buffers in use: {}\n", pool.num_buffers());

    Ok(())
}

fn router_walkthrough() -> Result<(), AllocError> {
    println!("Router with size classes 15 and 180.");
    let mut router = Router::with_default_config();

    let small = router.allocate(15)?;
    print_alloc("15 byte request", small);

    let large = router.allocate(180)?;
    print_alloc("180 byte request", large);

    match router.allocate(16) {
        Ok(_) => println!("16 byte request unexpectedly succeeded"),
        Err(error) => println!("16 byte request: {error}"),
    }

    router.release(Some(small.cast()));
    let again = router.allocate(15)?;
    print_alloc("15 byte request after release", again);
    println!("same block reused: {}", again.cast::<u8>() == small.cast::<u8>());

    router.release(Some(again.cast()));
    router.release(Some(large.cast()));
    router.release(None);
    router.teardown();

    Ok(())
}

fn main() -> Result<(), AllocError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    pool_walkthrough()?;
    router_walkthrough()
}

use clap::Parser;
use clap::ValueEnum;
use fd_table::FdTable;
use fd_table::FoldKeyHasher;
use fd_table::KeyHasher;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Keys {
    /// 0, 1, 2, ... like a process allocating descriptors
    Dense,
    /// Multiples of the stride, colliding in their low bits
    Strided,
    /// Uniformly random i32 keys
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Hash {
    Identity,
    Foldhash,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: usize,

    #[arg(short = 'k', long = "keys", value_enum, default_value_t = Keys::Dense)]
    keys: Keys,

    #[arg(long = "stride", default_value_t = 64)]
    stride: i32,

    #[arg(long = "hash", value_enum, default_value_t = Hash::Identity)]
    hash: Hash,

    /// Remove this share of the inserted keys before reporting
    #[arg(short = 'r', long = "remove-fraction", default_value_t = 0.0)]
    remove_fraction: f64,
}

fn run<H: KeyHasher>(args: &Args, mut table: FdTable<u32, H>) {
    let mut rng = SmallRng::seed_from_u64(0);
    let keys: Vec<i32> = (0..args.count)
        .map(|i| match args.keys {
            Keys::Dense => i as i32,
            Keys::Strided => (i as i32).wrapping_mul(args.stride),
            Keys::Random => rng.random(),
        })
        .collect();

    println!("Inserting {} {:?} keys with {:?} hashing...", args.count, args.keys, args.hash);
    for (i, &key) in keys.iter().enumerate() {
        if let Err(err) = table.insert(key, i as u32) {
            eprintln!("insert of {key} failed: {err}");
            return;
        }
    }

    let to_remove = (keys.len() as f64 * args.remove_fraction) as usize;
    for &key in keys.iter().take(to_remove) {
        table.remove(key);
    }
    if to_remove > 0 {
        println!("Removed {to_remove} keys");
    }

    println!("Entries: {}", table.len());
    println!("Capacity: {}", table.capacity());

    table.probe_histogram().print();
    table.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    match args.hash {
        Hash::Identity => run(&args, FdTable::new()),
        Hash::Foldhash => run(&args, FdTable::with_hasher(FoldKeyHasher::with_seed(0))),
    }
}

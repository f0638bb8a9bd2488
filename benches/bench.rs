// Criterion benchmarks for Maid Match

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use maid_match::core::{
    distance::{haversine_distance, calculate_bounding_box},
    filters::EligibilityFilter,
    Matcher, BROADCAST_LIMIT,
};
use maid_match::models::{
    AccountStatus, Availability, Booking, BookingStatus, Cleaner, CleanerStats, DateOption,
    GeoPoint, House, Onboarding, PricingBreakdown, TimeSlot, VerificationStatus,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

const CENTER: GeoPoint = GeoPoint { lat: 30.2672, lng: -97.7431 };

fn create_cleaner(id: usize, lat: f64, lng: f64) -> Cleaner {
    Cleaner {
        id: format!("cleaner_{}", id),
        user_id: format!("user_{}", id),
        verification_status: if id % 7 == 0 { VerificationStatus::Pending } else { VerificationStatus::Approved },
        account_status: AccountStatus::Active,
        onboarding: Onboarding::complete(),
        base_location: Some(GeoPoint::new(lat, lng)),
        service_radius_miles: Some(10.0 + (id % 3) as f64 * 5.0),
        availability: Availability::all_day(),
        service_types: ["standard".to_string(), "deep".to_string()].into_iter().collect(),
        specialties: vec!["deep".to_string()],
        stats: CleanerStats {
            rating: 3.5 + (id % 15) as f64 * 0.1,
            total_reviews: (id % 40) as u32,
            acceptance_rate: Some(0.4 + (id % 6) as f64 * 0.1),
            reliability_score: None,
        },
        last_active_at: Some(Utc.with_ymd_and_hms(2025, 5, 28, 11, 0, 0).unwrap() - Duration::minutes((id % 90) as i64)),
        upcoming_job_count: (id % 7) as u32,
        jobs: vec![],
    }
}

fn create_pool(count: usize) -> Vec<Cleaner> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.003) % 0.4 - 0.2;
            let lng_offset = (i as f64 * 0.007) % 0.4 - 0.2;
            create_cleaner(i, CENTER.lat + lat_offset, CENTER.lng + lng_offset)
        })
        .collect()
}

fn create_house() -> House {
    House {
        id: "house_1".to_string(),
        owner_id: "customer_1".to_string(),
        location: Some(CENTER),
        address: Default::default(),
        sqft: Some(2000),
        has_pets: true,
    }
}

fn create_booking() -> Booking {
    Booking {
        id: "booking_1".to_string(),
        customer_id: "customer_1".to_string(),
        house_id: "house_1".to_string(),
        service_type: "deep".to_string(),
        date_options: vec![
            DateOption { date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), time_slot: Some(TimeSlot::Morning), time: None, priority: 1 },
            DateOption { date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), time_slot: Some(TimeSlot::Afternoon), time: None, priority: 2 },
        ],
        pricing: PricingBreakdown { subtotal: Some(220.0), total: 238.15, taxes: Some(18.15) },
        status: BookingStatus::Placed,
        cleaner_id: None,
        version: 0,
        created_at: None,
        updated_at: None,
    }
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(30.2672),
                black_box(-97.7431),
                black_box(30.5083),
                black_box(-97.6789),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| calculate_bounding_box(black_box(CENTER), black_box(25.0)));
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();
    let booking = create_booking();
    let house = create_house();
    let now = Utc.with_ymd_and_hms(2025, 5, 28, 12, 0, 0).unwrap();

    let mut group = c.benchmark_group("matching");

    for pool_size in [10, 50, 100, 500, 1000].iter() {
        let pool = create_pool(*pool_size);

        group.bench_with_input(
            BenchmarkId::new("find_matches", pool_size),
            pool_size,
            |b, _| {
                b.iter(|| {
                    matcher.find_matches(
                        black_box(&booking),
                        black_box(&house),
                        black_box(pool.clone()),
                        black_box(Some(BROADCAST_LIMIT)),
                        now,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_eligibility(c: &mut Criterion) {
    let filter = EligibilityFilter::new(15.0, 5);
    let booking = create_booking();
    let house = create_house();
    let pool = create_pool(100);

    c.bench_function("eligibility_100_cleaners", |b| {
        b.iter(|| black_box(filter.find_eligible(&booking, &house, pool.clone())));
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_bounding_box,
    bench_matching,
    bench_eligibility
);

criterion_main!(benches);

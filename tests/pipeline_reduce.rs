use std::fs;
use std::path::{Path, PathBuf};

use ridership::{
    AggFunc, Cell, DistanceUnit, FailurePolicy, Freq, Pipeline, PipelineConfig, PipelineError,
    RecordSet, StationMetric, StationParams, Table, TemporalParams, ViewRequest,
    aggregate_record_set,
};
use tempfile::tempdir;

const LEGACY_HEADER: &str = "tripduration,starttime,stoptime,start station id,start station name,start station latitude,start station longitude,end station id,end station name,end station latitude,end station longitude,bikeid,usertype,birth year,gender";
const MODERN_HEADER: &str = "ride_id,rideable_type,started_at,ended_at,start_station_name,start_station_id,end_station_name,end_station_id,start_lat,start_lng,end_lat,end_lng,member_casual";

fn write_trip_file(root: &Path, year: i32, month: u32, name: &str, header: &str, rows: &[String]) -> PathBuf {
    let dir = root.join(year.to_string()).join(format!("{month:02}"));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let mut body = String::from(header);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

fn legacy_row(start: &str, end: &str, from: &str, to: &str, usertype: &str) -> String {
    format!(
        "600,{start},{end},1,{from},40.7500,-73.9900,2,{to},40.7600,-73.9800,12345,{usertype},1990,1"
    )
}

fn modern_row(start: &str, end: &str, from: &str, to: &str, rideable: &str, member: &str) -> String {
    format!(
        "ABC123,{rideable},{start},{end},{from},S1,{to},S2,40.7400,-73.9700,40.7700,-73.9600,{member}"
    )
}

fn station_value(table: &Table, station: &str) -> f64 {
    table
        .rows
        .iter()
        .find(|row| row[0] == Cell::Text(station.to_string()))
        .and_then(|row| row[1].as_number())
        .unwrap_or_else(|| panic!("station {station} missing"))
}

fn assert_tables_close(left: &Table, right: &Table) {
    assert_eq!(left.columns, right.columns);
    assert_eq!(left.rows.len(), right.rows.len());
    for (lrow, rrow) in left.rows.iter().zip(&right.rows) {
        for (lcell, rcell) in lrow.iter().zip(rrow) {
            match (lcell, rcell) {
                (Cell::Number(a), Cell::Number(b)) => {
                    assert!((a - b).abs() < 1e-9, "{a} != {b}");
                }
                _ => assert_eq!(lcell, rcell),
            }
        }
    }
}

fn january_rows() -> Vec<Vec<String>> {
    vec![
        vec![
            modern_row("2024-01-01 08:00:00", "2024-01-01 08:10:00", "A", "B", "electric_bike", "member"),
            modern_row("2024-01-01 09:00:00", "2024-01-01 09:30:00", "B", "C", "classic_bike", "casual"),
        ],
        vec![
            modern_row("2024-01-03 12:00:00", "2024-01-03 12:05:00", "C", "A", "classic_bike", "member"),
            modern_row("2024-01-03 18:00:00", "2024-01-03 18:20:00", "A", "A", "electric_bike", "member"),
        ],
        vec![modern_row("2024-01-04 07:00:00", "2024-01-04 07:45:00", "B", "A", "classic_bike", "casual")],
    ]
}

fn january_fixture(root: &Path) -> Vec<PathBuf> {
    january_rows()
        .iter()
        .enumerate()
        .map(|(idx, rows)| {
            let name = format!("202401-citibike-tripdata_{}.csv", idx + 1);
            write_trip_file(root, 2024, 1, &name, MODERN_HEADER, rows)
        })
        .collect()
}

fn single_pass(pipeline: &Pipeline, files: &[PathBuf], view: &ViewRequest) -> Table {
    let mut all = RecordSet::new("all", pipeline.config().unit);
    for path in files {
        all.extend(pipeline.normalizer().normalize(path).unwrap());
    }
    aggregate_record_set(&all, view).unwrap()
}

#[test]
fn partitioned_runs_match_single_pass() {
    let dir = tempdir().unwrap();
    let files = january_fixture(dir.path());
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path()).with_years([2024])).unwrap();
    let mut workers = vec![1, 2, num_cpus::get()];
    workers.retain(|count| *count <= num_cpus::get());
    workers.dedup();
    let single_file = vec![write_trip_file(
        dir.path(),
        2023,
        12,
        "combined.csv",
        MODERN_HEADER,
        &january_rows().concat(),
    )];

    let views = [
        ViewRequest::Temporal(TemporalParams::default()),
        ViewRequest::Temporal(
            TemporalParams::default()
                .with_freq(Freq::Hour)
                .with_agg_funcs(vec![AggFunc::Mean, AggFunc::Min, AggFunc::Max, AggFunc::Count]),
        ),
        ViewRequest::Station(StationParams::default()),
        ViewRequest::Station(StationParams {
            metric: StationMetric::Duration,
            agg_func: AggFunc::Mean,
        }),
    ];
    for view in &views {
        let expected = single_pass(&pipeline, &files, view);
        for &max_workers in &workers {
            let outcome = pipeline.run_files(view, &files, Some(max_workers)).unwrap();
            assert_tables_close(&outcome.table, &expected);
            assert_eq!(outcome.report.files_succeeded, 3);
            assert_eq!(outcome.report.records, 5);
        }
        // Same rows grouped into one file.
        let combined = pipeline.run_files(view, &single_file, Some(1)).unwrap();
        assert_tables_close(&combined.table, &expected);
    }
}

#[test]
fn temporal_summary_fills_gaps_across_files() {
    let dir = tempdir().unwrap();
    let files = january_fixture(dir.path());
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let outcome = pipeline
        .run_files(&ViewRequest::Temporal(TemporalParams::default()), &files, Some(1))
        .unwrap();
    let table = outcome.table;
    assert_eq!(
        table.columns,
        vec![
            "start_dt",
            "membership_sum",
            "electric_sum",
            "dist_mi_sum",
            "dist_mi_mean",
            "duration_sec_sum",
            "duration_sec_mean",
        ]
    );
    let labels: Vec<String> = table.rows.iter().map(|row| row[0].render()).collect();
    assert_eq!(
        labels,
        vec![
            "2024-01-01 00:00:00",
            "2024-01-02 00:00:00",
            "2024-01-03 00:00:00",
            "2024-01-04 00:00:00",
        ]
    );
    assert_eq!(
        table.numeric_column("membership_sum").unwrap(),
        vec![1.0, 0.0, 2.0, 0.0]
    );
    assert_eq!(
        table.numeric_column("electric_sum").unwrap(),
        vec![1.0, 0.0, 1.0, 0.0]
    );
    assert_eq!(
        table.numeric_column("duration_sec_sum").unwrap(),
        vec![2400.0, 0.0, 1500.0, 2700.0]
    );
    assert_eq!(
        table.numeric_column("duration_sec_mean").unwrap(),
        vec![1200.0, 0.0, 750.0, 2700.0]
    );
}

#[test]
fn mixed_schema_revisions_aggregate_together() {
    let dir = tempdir().unwrap();
    write_trip_file(
        dir.path(),
        2014,
        1,
        "2014-01 - Citi Bike trip data.csv",
        LEGACY_HEADER,
        &[legacy_row("2014-01-01 10:00:00", "2014-01-01 10:05:00", "A", "B", "Subscriber")],
    );
    write_trip_file(
        dir.path(),
        2021,
        6,
        "202106-citibike-tripdata.csv",
        MODERN_HEADER,
        &[modern_row("2021-06-01 10:00:00", "2021-06-01 10:10:00", "C", "A", "classic_bike", "casual")],
    );
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path()).with_years([2014, 2021])).unwrap();
    let view = ViewRequest::Station(StationParams {
        metric: StationMetric::Duration,
        agg_func: AggFunc::Sum,
    });
    let output = dir.path().join("out").join("stations.csv");
    let outcome = pipeline.run(&view, &output, Some(1)).unwrap();

    assert_eq!(outcome.report.files_total, 2);
    assert!(outcome.report.failures.is_empty());
    assert_eq!(outcome.table.columns, vec!["station", "duration_sec_sum"]);
    assert_eq!(station_value(&outcome.table, "A"), 900.0);
    assert_eq!(station_value(&outcome.table, "B"), 300.0);
    assert_eq!(station_value(&outcome.table, "C"), 600.0);

    let written = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["station,duration_sec_sum", "A,900", "B,300", "C,600"]);
}

#[test]
fn station_sides_combine_per_station() {
    let dir = tempdir().unwrap();
    let header = "started_at,ended_at,start_station_name,end_station_name,start_lat,start_lng,end_lat,end_lng";
    let files = vec![
        write_trip_file(
            dir.path(),
            2024,
            3,
            "trips_a.csv",
            header,
            &["2024-03-01 10:00:00,2024-03-01 10:03:00,A,B,0,0,0,0".to_string()],
        ),
        write_trip_file(
            dir.path(),
            2024,
            3,
            "trips_b.csv",
            header,
            &["2024-03-01 11:00:00,2024-03-01 11:02:00,C,A,0,0,0,0".to_string()],
        ),
    ];
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let view = ViewRequest::Station(StationParams {
        metric: StationMetric::Duration,
        agg_func: AggFunc::Count,
    });
    let minutes = pipeline.run_files(&view, &files, Some(1)).unwrap().table;
    assert_eq!(station_value(&minutes, "A"), 2.0);

    let sums = pipeline
        .run_files(
            &ViewRequest::Station(StationParams {
                metric: StationMetric::Duration,
                agg_func: AggFunc::Sum,
            }),
            &files,
            Some(1),
        )
        .unwrap()
        .table;
    assert_eq!(station_value(&sums, "A"), 180.0 + 120.0);
    assert_eq!(station_value(&sums, "B"), 180.0);
    assert_eq!(station_value(&sums, "C"), 120.0);
}

#[test]
fn unparsable_rows_are_dropped_and_counted() {
    let dir = tempdir().unwrap();
    let files = vec![write_trip_file(
        dir.path(),
        2024,
        1,
        "trips.csv",
        MODERN_HEADER,
        &[
            modern_row("2024-01-01 08:00:00", "2024-01-01 08:10:00", "A", "B", "classic_bike", "member"),
            modern_row("not a time", "2024-01-01 08:10:00", "A", "B", "classic_bike", "member"),
            modern_row("2024-01-01 09:00:00", "2024-01-01 09:10:00", "A", "B", "docked_bike", "member"),
        ],
    )];
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let outcome = pipeline
        .run_files(&ViewRequest::Station(StationParams::default()), &files, Some(1))
        .unwrap();
    assert_eq!(outcome.report.records, 1);
    assert_eq!(outcome.report.dropped, 2);
}

#[test]
fn missing_vehicle_column_defaults_to_classic() {
    let dir = tempdir().unwrap();
    let files = vec![write_trip_file(
        dir.path(),
        2016,
        5,
        "201605-citibike-tripdata.csv",
        LEGACY_HEADER,
        &[
            legacy_row("2016-05-01 10:00:00", "2016-05-01 10:05:00", "A", "B", "Customer"),
            legacy_row("2016-05-01 11:00:00", "2016-05-01 11:05:00", "A", "B", "Subscriber"),
        ],
    )];
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let table = pipeline
        .run_files(&ViewRequest::Temporal(TemporalParams::default()), &files, Some(1))
        .unwrap()
        .table;
    assert_eq!(table.numeric_column("electric_sum").unwrap(), vec![0.0]);
    assert_eq!(table.numeric_column("membership_sum").unwrap(), vec![1.0]);
}

fn good_and_bad_files(root: &Path) -> Vec<PathBuf> {
    vec![
        write_trip_file(
            root,
            2024,
            1,
            "a_good.csv",
            MODERN_HEADER,
            &[modern_row("2024-01-01 08:00:00", "2024-01-01 08:10:00", "A", "B", "classic_bike", "member")],
        ),
        write_trip_file(
            root,
            2024,
            1,
            "b_bad.csv",
            "started_at,ended_at,end_station_name,start_lat,start_lng,end_lat,end_lng",
            &["2024-01-01 08:00:00,2024-01-01 08:10:00,B,0,0,0,0".to_string()],
        ),
    ]
}

#[test]
fn failed_files_are_skipped_by_default() {
    let dir = tempdir().unwrap();
    let files = good_and_bad_files(dir.path());
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let outcome = pipeline
        .run_files(&ViewRequest::Station(StationParams::default()), &files, None)
        .unwrap();
    assert_eq!(outcome.report.files_total, 2);
    assert_eq!(outcome.report.files_succeeded, 1);
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].path, files[1]);
    assert!(matches!(
        &outcome.report.failures[0].error,
        PipelineError::Schema { field, .. } if field == "start_station"
    ));
    assert_eq!(outcome.table.rows.len(), 2);
}

#[test]
fn strict_policy_aborts_the_run() {
    let dir = tempdir().unwrap();
    let files = good_and_bad_files(dir.path());
    let output = dir.path().join("stations.csv");
    let pipeline = Pipeline::new(
        PipelineConfig::new(dir.path())
            .with_years([2024])
            .with_failure_policy(FailurePolicy::Abort),
    )
    .unwrap();
    let result = pipeline.run(&ViewRequest::Station(StationParams::default()), &output, None);
    assert!(matches!(result, Err(PipelineError::Schema { .. })));
    assert!(!output.exists());
    assert!(files.iter().all(|path| path.exists()));
}

#[test]
fn worker_count_is_checked_before_any_work() {
    let dir = tempdir().unwrap();
    january_fixture(dir.path());
    let output = dir.path().join("summary.csv");
    let pipeline = Pipeline::new(PipelineConfig::new(dir.path())).unwrap();
    let view = ViewRequest::Temporal(TemporalParams::default());

    for bad in [0, num_cpus::get() + 1] {
        let result = pipeline.run(&view, &output, Some(bad));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
        assert!(!output.exists());
    }
}

#[test]
fn empty_tree_writes_header_only_table() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("summary.csv");
    let pipeline = Pipeline::new(
        PipelineConfig::new(dir.path().join("missing")).with_unit(DistanceUnit::Km),
    )
    .unwrap();
    let outcome = pipeline
        .run(&ViewRequest::Station(StationParams::default()), &output, Some(1))
        .unwrap();
    assert_eq!(outcome.report.files_total, 0);
    assert!(outcome.table.rows.is_empty());
    assert_eq!(fs::read_to_string(&output).unwrap().trim_end(), "station,dist_km_sum");
}

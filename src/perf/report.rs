//! Conversion of host-agent reports into typed records.

use topowatch_types::{
    Host, PerformanceRecord, RawHostProcess, RawHostReport, UNKNOWN_FLOAT, UNKNOWN_INT,
};

/// Machine state of `hname` from its agent's report.
///
/// Only the first disk and the first network interface are used. Anything
/// not reported becomes the unknown sentinel.
pub fn host_from_report(hname: &str, report: &RawHostReport) -> Host {
    let memory = report.memory.as_ref();
    let disk = report.disks.first();
    let network = report.networks.first();

    Host {
        hname: hname.to_string(),
        cpu_load: report.cpu_load.unwrap_or(UNKNOWN_FLOAT),
        total_memory: memory.and_then(|m| m.total).unwrap_or(UNKNOWN_INT),
        available_memory: memory.and_then(|m| m.available).unwrap_or(UNKNOWN_INT),
        capacity_disk: disk.and_then(|d| d.capacity).unwrap_or(UNKNOWN_INT),
        available_disk: disk.and_then(|d| d.available).unwrap_or(UNKNOWN_INT),
        network_send: network.and_then(|n| n.send).unwrap_or(UNKNOWN_INT),
        network_receive: network.and_then(|n| n.receive).unwrap_or(UNKNOWN_INT),
        num_cpu_cores: report.number_of_cpu_cores.unwrap_or(UNKNOWN_INT),
        os: report.operating_system.clone().unwrap_or_default(),
    }
}

/// Performance counters of one reported process. `None` without a pid.
pub fn record_from_report(hname: &str, process: &RawHostProcess) -> Option<PerformanceRecord> {
    let pid = process.id?;
    let memory = process.memory.as_ref();
    let cpu = process.cpu.as_ref();

    Some(PerformanceRecord {
        hname: hname.to_string(),
        pid,
        current_working_set_size: memory
            .and_then(|m| m.current_working_set_size)
            .unwrap_or(UNKNOWN_INT),
        peak_working_set_size: memory
            .and_then(|m| m.peak_working_set_size)
            .unwrap_or(UNKNOWN_INT),
        cpu_kernel_time: cpu.and_then(|c| c.cpu_kernel_time).unwrap_or(UNKNOWN_INT),
        cpu_user_time: cpu.and_then(|c| c.cpu_user_time).unwrap_or(UNKNOWN_INT),
        cpu_creation_time: cpu.and_then(|c| c.cpu_creation_time).unwrap_or(UNKNOWN_INT),
        cpu_load: cpu.and_then(|c| c.cpu_load).unwrap_or(UNKNOWN_FLOAT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use topowatch_types::{RawDisk, RawMemory, RawProcessCpu};

    #[test]
    fn missing_sub_fields_become_sentinels() {
        let report = RawHostReport {
            memory: Some(RawMemory {
                total: Some(100),
                available: None,
            }),
            disks: vec![
                RawDisk {
                    capacity: Some(10),
                    available: Some(5),
                },
                RawDisk {
                    capacity: Some(99),
                    available: Some(1),
                },
            ],
            ..Default::default()
        };

        let host = host_from_report("H1", &report);

        assert_eq!(host.total_memory, 100);
        assert_eq!(host.available_memory, UNKNOWN_INT);
        assert_eq!(host.capacity_disk, 10);
        assert_eq!(host.network_send, UNKNOWN_INT);
        assert_eq!(host.cpu_load, UNKNOWN_FLOAT);
    }

    #[test]
    fn process_without_id_is_skipped() {
        let process = RawHostProcess {
            id: None,
            ..Default::default()
        };
        assert!(record_from_report("H1", &process).is_none());

        let process = RawHostProcess {
            id: Some(42),
            cpu: Some(RawProcessCpu {
                cpu_load: Some(12.5),
                ..Default::default()
            }),
            memory: None,
        };
        let record = record_from_report("H1", &process).unwrap();
        assert_eq!(record.cpu_load, 12.5);
        assert_eq!(record.cpu_kernel_time, UNKNOWN_INT);
        assert_eq!(record.current_working_set_size, UNKNOWN_INT);
    }
}

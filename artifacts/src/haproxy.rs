use clusterforge_cluster::{NodeIdentity, NodeInventory};
use clusterforge_common::{ClusterSpec, DASHBOARD_PORT, DATA_PLANE_PORT, STATS_PORT};
use std::fmt;

pub const DATA_PLANE_LISTENER: &str = "mqtt";
pub const DASHBOARD_LISTENER: &str = "dashboard";
pub const STATS_LISTENER: &str = "stats";

/// Idle timeout of persistent data-plane connections
pub const DATA_PLANE_IDLE_TIMEOUT: &str = "3h";

const STICKY_COOKIE: &str = "SRVID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Tcp,
    Http,
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Tcp => write!(f, "tcp"),
            ProxyMode::Http => write!(f, "http"),
        }
    }
}

/// One `server` line of a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Sticky-session cookie value, unique per backend
    pub cookie: Option<String>,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server {} {}:{} check", self.name, self.host, self.port)?;
        if let Some(cookie) = &self.cookie {
            write!(f, " cookie {}", cookie)?;
        }
        Ok(())
    }
}

/// A `listen` section: a bound port, its directives and its backend pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub name: String,
    pub bind_port: u16,
    pub mode: ProxyMode,
    pub directives: Vec<String>,
    pub backends: Vec<Backend>,
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "listen {}", self.name)?;
        writeln!(f, "    bind *:{}", self.bind_port)?;
        writeln!(f, "    mode {}", self.mode)?;
        for directive in &self.directives {
            writeln!(f, "    {}", directive)?;
        }
        for backend in &self.backends {
            writeln!(f, "    {}", backend)?;
        }
        Ok(())
    }
}

impl NodeInventory for Listener {
    fn artifact_name(&self) -> &str {
        &self.name
    }

    fn node_hosts(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.host.as_str()).collect()
    }
}

/// Reverse-proxy configuration (haproxy.cfg)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerConfig {
    pub global: Vec<String>,
    pub defaults: Vec<String>,
    pub listeners: Vec<Listener>,
}

impl LoadBalancerConfig {
    /// Build the data-plane, dashboard and stats listeners over `identities`
    pub fn emit(identities: &[NodeIdentity], spec: &ClusterSpec) -> Self {
        let data_plane = Listener {
            name: DATA_PLANE_LISTENER.to_string(),
            bind_port: DATA_PLANE_PORT,
            mode: ProxyMode::Tcp,
            directives: vec![
                format!("balance {}", spec.lb_strategy()),
                "option tcplog".to_string(),
                "option clitcpka".to_string(),
                format!("timeout client {}", DATA_PLANE_IDLE_TIMEOUT),
                format!("timeout server {}", DATA_PLANE_IDLE_TIMEOUT),
            ],
            backends: identities
                .iter()
                .map(|n| Backend {
                    name: n.service_name(),
                    host: n.hostname.clone(),
                    port: DATA_PLANE_PORT,
                    cookie: None,
                })
                .collect(),
        };

        let dashboard = Listener {
            name: DASHBOARD_LISTENER.to_string(),
            bind_port: DASHBOARD_PORT,
            mode: ProxyMode::Http,
            directives: vec![
                "balance roundrobin".to_string(),
                "option httplog".to_string(),
                format!("cookie {} insert indirect nocache", STICKY_COOKIE),
            ],
            backends: identities
                .iter()
                .map(|n| Backend {
                    name: n.service_name(),
                    host: n.hostname.clone(),
                    port: DASHBOARD_PORT,
                    cookie: Some(n.service_name()),
                })
                .collect(),
        };

        let stats = Listener {
            name: STATS_LISTENER.to_string(),
            bind_port: STATS_PORT,
            mode: ProxyMode::Http,
            directives: vec![
                "stats enable".to_string(),
                "stats uri /".to_string(),
                "stats refresh 10s".to_string(),
            ],
            backends: Vec::new(),
        };

        Self {
            global: vec![
                "log stdout format raw local0 info".to_string(),
                "maxconn 1000000".to_string(),
            ],
            defaults: vec![
                "log global".to_string(),
                "timeout connect 5s".to_string(),
                "timeout client 60s".to_string(),
                "timeout server 60s".to_string(),
            ],
            listeners: vec![data_plane, dashboard, stats],
        }
    }

    pub fn listener(&self, name: &str) -> Option<&Listener> {
        self.listeners.iter().find(|l| l.name == name)
    }

    /// Listeners that balance over broker nodes
    pub fn node_pools(&self) -> impl Iterator<Item = &Listener> {
        self.listeners.iter().filter(|l| l.name != STATS_LISTENER)
    }
}

impl fmt::Display for LoadBalancerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "global")?;
        for line in &self.global {
            writeln!(f, "    {}", line)?;
        }
        writeln!(f)?;
        writeln!(f, "defaults")?;
        for line in &self.defaults {
            writeln!(f, "    {}", line)?;
        }
        for listener in &self.listeners {
            writeln!(f)?;
            write!(f, "{}", listener)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterforge_cluster::ClusterTopology;
    use clusterforge_common::{BrokerLogLevel, LoadBalanceStrategy};
    use std::collections::HashSet;

    fn emit(total: usize, core: usize, strategy: LoadBalanceStrategy) -> LoadBalancerConfig {
        let spec = ClusterSpec::new(total, core, strategy, BrokerLogLevel::Notice).unwrap();
        let topology = ClusterTopology::build(&spec).unwrap();
        LoadBalancerConfig::emit(topology.nodes(), &spec)
    }

    #[test]
    fn test_pools_cover_every_node() {
        let config = emit(4, 2, LoadBalanceStrategy::RoundRobin);

        let data_plane = config.listener(DATA_PLANE_LISTENER).unwrap();
        let dashboard = config.listener(DASHBOARD_LISTENER).unwrap();
        assert_eq!(data_plane.backends.len(), 4);
        assert_eq!(dashboard.backends.len(), 4);

        let cookies: HashSet<_> = dashboard.backends.iter().map(|b| b.cookie.clone()).collect();
        assert_eq!(cookies.len(), 4);
        assert!(!cookies.contains(&None));

        assert!(config.listener(STATS_LISTENER).unwrap().backends.is_empty());
        assert_eq!(config.node_pools().count(), 2);
    }

    #[test]
    fn test_strategy_applies_to_data_plane_only() {
        let config = emit(3, 1, LoadBalanceStrategy::LeastConn);

        let data_plane = config.listener(DATA_PLANE_LISTENER).unwrap();
        assert!(data_plane.directives.contains(&"balance leastconn".to_string()));

        let dashboard = config.listener(DASHBOARD_LISTENER).unwrap();
        assert!(dashboard.directives.contains(&"balance roundrobin".to_string()));
    }

    #[test]
    fn test_rendering() {
        let rendered = emit(2, 1, LoadBalanceStrategy::RoundRobin).to_string();

        assert!(rendered.starts_with("global\n"));
        assert!(rendered.contains("listen mqtt\n    bind *:1883\n    mode tcp\n    balance roundrobin\n"));
        assert!(rendered.contains("    timeout client 3h\n"));
        assert!(rendered.contains("    server n2 n2.local:1883 check\n"));
        assert!(rendered.contains("    server n1 n1.local:18083 check cookie n1\n"));
        assert!(rendered.contains("listen stats\n    bind *:8888\n"));
    }

    #[test]
    fn test_stats_listener_independent_of_node_count() {
        let small = emit(1, 1, LoadBalanceStrategy::RoundRobin);
        let large = emit(30, 5, LoadBalanceStrategy::RoundRobin);

        assert_eq!(
            small.listener(STATS_LISTENER),
            large.listener(STATS_LISTENER)
        );
    }
}

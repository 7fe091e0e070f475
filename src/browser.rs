use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address a local browser should use to reach the listener. Wildcard binds
/// are rewritten to loopback.
pub fn local_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}/", SocketAddr::new(ip, addr.port()))
}

/// Opens `url` in the background. Call only once the listener is bound so
/// the first page load cannot race the server.
///
/// The launch runs on the blocking pool and is not cancellable once started,
/// so no handle is returned. Failures are logged, never returned.
pub fn spawn_launch(url: String, browser: Option<String>) {
    tokio::task::spawn_blocking(move || launch(&url, browser.as_deref()));
}

fn launch(url: &str, browser: Option<&str>) {
    if let Some(app) = browser {
        match open::with_detached(url, app) {
            Ok(()) => {
                tracing::info!("Opened {url} in {app}");
                return;
            }
            Err(e) => tracing::warn!("Could not open {url} in {app}, trying default browser: {e}"),
        }
    }

    match open::that_detached(url) {
        Ok(()) => tracing::info!("Opened {url} in the default browser"),
        Err(e) => tracing::warn!("Could not open a browser, visit {url} manually: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_v4_becomes_loopback() {
        let addr: SocketAddr = "0.0.0.0:5000".parse().unwrap();
        assert_eq!(local_url(addr), "http://127.0.0.1:5000/");
    }

    #[test]
    fn wildcard_v6_becomes_loopback() {
        let addr: SocketAddr = "[::]:8080".parse().unwrap();
        assert_eq!(local_url(addr), "http://[::1]:8080/");
    }

    #[test]
    fn concrete_address_is_kept() {
        let addr: SocketAddr = "192.168.1.20:5000".parse().unwrap();
        assert_eq!(local_url(addr), "http://192.168.1.20:5000/");
    }
}

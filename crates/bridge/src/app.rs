//! Embedded wallet page served at the relay root.

pub(crate) mod contents {
    /// Single-file page driving the injected wallet.
    ///
    /// The page reads its session token from the `token` query parameter and
    /// presents it as `X-Session-Token` on every relay call. Queued calls are
    /// collected from `GET /api/request`, executed against `window.ethereum`,
    /// and answered on `POST /api/response`; wallet notifications are
    /// forwarded to `POST /api/event`.
    pub(crate) const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sextant Wallet Relay</title>
<style>
  body {
    font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace;
    background: #101214;
    color: #d8dee9;
    display: flex;
    justify-content: center;
    margin-top: 20vh;
  }
  main { text-align: center; }
  h1 { font-size: 1.2rem; font-weight: 600; }
  #status { color: #88909b; }
</style>
</head>
<body>
<main>
  <h1>Sextant Wallet Relay</h1>
  <p id="status">Waiting for wallet calls.</p>
</main>
<script>
  const token = new URLSearchParams(window.location.search).get('token') || '';
  const headers = { 'Content-Type': 'application/json', 'X-Session-Token': token };

  function status(text) {
    document.getElementById('status').textContent = text;
  }

  async function post(path, body) {
    await fetch(path, { method: 'POST', headers, body: JSON.stringify(body) });
  }

  async function execute(request) {
    const call = { method: request.method };
    if (request.params !== undefined) {
      call.params = request.params;
    }
    try {
      const result = await window.ethereum.request(call);
      await post('/api/response', { id: request.id, result: result, error: null });
    } catch (err) {
      await post('/api/response', {
        id: request.id,
        result: null,
        error: { code: err.code || -32603, message: err.message || String(err) },
      });
    }
  }

  async function poll() {
    try {
      const resp = await fetch('/api/request', { headers });
      if (resp.status === 403) {
        status('Session token rejected. Reopen the link printed by the CLI.');
        return;
      }
      const body = await resp.json();
      if (body.id) {
        status('Executing ' + body.method);
        await execute(body);
        status('Waiting for wallet calls.');
      }
    } catch (err) {
      status('Relay unreachable, retrying.');
    }
    setTimeout(poll, 500);
  }

  if (window.ethereum === undefined) {
    status('No browser wallet detected.');
  } else {
    window.ethereum.on('accountsChanged', function (accounts) {
      post('/api/event', { event: 'accountsChanged', payload: accounts });
    });
    window.ethereum.on('chainChanged', function (chainId) {
      post('/api/event', { event: 'chainChanged', payload: chainId });
    });
    poll();
  }
</script>
</body>
</html>
"#;
}
